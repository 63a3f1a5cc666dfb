//! Per-instance application context.

use std::fmt;
use std::sync::Arc;

use crate::id::AppInstanceId;
use crate::types::output::OutputSink;
use crate::types::resource::ResourcePool;

/// Everything an application instance may know about the paragraph it is
/// bound to.
///
/// The context is the only capability surface an application receives:
/// host services are reached through the pool and the output sink, never
/// through globals. It is created by the caller, handed to the loader, and
/// kept by the instance for its whole lifetime.
#[derive(Clone)]
pub struct ApplicationContext {
    note_id: String,
    paragraph_id: String,
    app_instance_id: AppInstanceId,
    resource_pool: Arc<dyn ResourcePool>,
    output: Arc<dyn OutputSink>,
}

impl ApplicationContext {
    /// Create a context.
    pub fn new(
        note_id: impl Into<String>,
        paragraph_id: impl Into<String>,
        app_instance_id: impl Into<AppInstanceId>,
        resource_pool: Arc<dyn ResourcePool>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            paragraph_id: paragraph_id.into(),
            app_instance_id: app_instance_id.into(),
            resource_pool,
            output,
        }
    }

    /// Note the instance is bound to.
    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    /// Paragraph the instance is bound to.
    pub fn paragraph_id(&self) -> &str {
        &self.paragraph_id
    }

    /// Identity of the loaded instance.
    pub fn app_instance_id(&self) -> &AppInstanceId {
        &self.app_instance_id
    }

    /// Session resource pool.
    pub fn resource_pool(&self) -> &Arc<dyn ResourcePool> {
        &self.resource_pool
    }

    /// Paragraph output.
    pub fn output(&self) -> &Arc<dyn OutputSink> {
        &self.output
    }

    /// Write to the paragraph output.
    pub fn print(&self, text: &str) {
        self.output.write(text);
    }

    /// Write a line to the paragraph output.
    pub fn println(&self, text: &str) {
        self.output.write(text);
        self.output.write("\n");
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("note_id", &self.note_id)
            .field("paragraph_id", &self.paragraph_id)
            .field("app_instance_id", &self.app_instance_id)
            .field("resource_pool", &self.resource_pool.id())
            .finish()
    }
}
