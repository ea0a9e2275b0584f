//! Elastic CPU Exporter Common Library
//!
//! 共通型定義、設定、エラー型を提供

#![warn(missing_docs)]

/// ノード統計APIのレスポンス型
pub mod types;

/// 設定管理
pub mod config;

/// エラー型定義
pub mod error;
