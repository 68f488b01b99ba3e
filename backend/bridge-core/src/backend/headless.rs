use crate::backend::Backend;
use crate::commands::CommandTable;
use crate::document::Document;
use crate::error::CoreError;

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::debug;
use models::{BackendKind, Params};
use serde_json::Value;
use tokio::sync::Mutex;

/// Runs commands in-process against an in-memory document.
pub struct HeadlessEngine {
    table: Arc<CommandTable>,
    document: Mutex<Document>,
}

impl HeadlessEngine {
    pub fn new(table: Arc<CommandTable>) -> Self {
        Self::with_document(table, Document::default())
    }

    pub fn with_document(table: Arc<CommandTable>, document: Document) -> Self {
        Self {
            table,
            document: Mutex::new(document),
        }
    }

    /// Copy of the current document.
    pub async fn snapshot(&self) -> Document {
        self.document.lock().await.clone()
    }
}

impl Backend for HeadlessEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move {
            let mut document = self.document.lock().await;
            debug!("Headless executing '{command}'");
            Ok(self
                .table
                .execute_on_document(command, &mut document, params)?)
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}
