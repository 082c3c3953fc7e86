use std::future::Future;

use crate::error::DiaryError;

use super::models::{Label, LabelInput, LabelUpdate};

/// Persistent, process-wide label catalog.
///
/// Created once at startup and shared; every read and write is an explicit
/// call, there is no hidden global state.
pub trait LabelRepository: Send + Sync + 'static {
    /// Live labels ordered by `order_index`.
    fn list(&self) -> impl Future<Output = Result<Vec<Label>, DiaryError>> + Send;

    fn create(&self, input: LabelInput) -> impl Future<Output = Result<Label, DiaryError>> + Send;

    fn update(
        &self,
        id: &str,
        update: LabelUpdate,
    ) -> impl Future<Output = Result<Label, DiaryError>> + Send;

    /// Entries keep the id in their marker; it simply stops resolving to a name.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), DiaryError>> + Send;
}
