use thiserror::Error;

/// 導関数の抽出中に発生するエラー。
///
/// いずれも呼び出し元へ同期的に返され、内部で再試行されることはありません。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DerivativeError {
    /// 入力バッチが微分の前提を満たしていません（勾配追跡なし、空のバッチ、非有限値など）。
    #[error("入力バッチが不正です: {reason}")]
    InvalidInput { reason: String },

    /// 微分する入力次元のインデックスが `[0, dims)` の範囲外です。
    #[error("入力次元のインデックス {index} は範囲外です（入力次元数: {dims}）")]
    IndexOutOfRange { index: usize, dims: usize },

    /// 写像または導関数が NaN / Inf を生成しました。
    #[error("{quantity} に非有限値が含まれています（平坦化した位置: {position}）")]
    Numerical {
        quantity: &'static str,
        position: usize,
    },
}

impl DerivativeError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}
