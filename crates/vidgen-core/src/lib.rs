//! vidgen-core
//!
//! Core building blocks for the video generation service.
//!
//! # モジュール構成
//! - **config**: 環境変数から読む Settings
//! - **domain**: ドメインモデル（ids, task record, state, content, outcome, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, VideoBackend, PromptEnhancer, ArtifactStore, Clock, IdGenerator）
//! - **impls**: 実装（history.json ストア, Ark API クライアント, ダウンロード, アップロード）
//! - **app**: アプリケーションロジック（builder, poller, runner, worker pool, status）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
