//! BTS (Bureau of Transportation Statistics) フォーム操作モジュール
//!
//! On-Time Performance のデータ選択フォームを chromiumoxide で操作する

mod fields;
mod session;

pub use fields::{FieldLabel, REQUIRED_FIELDS};
pub use session::BtsFormSession;
