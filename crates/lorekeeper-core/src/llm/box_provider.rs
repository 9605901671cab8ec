//! Type-erased completion backend.
//!
//! [`LlmProvider::complete`] returns `impl Future`, so the trait cannot be a
//! trait object. The chat client only ever talks to one backend chosen from
//! config at startup, and [`BoxLlmProvider`] is how that choice is stored.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use lorekeeper_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::{EventStream, LlmProvider};

type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

/// Object-safe mirror of [`LlmProvider`], implemented for every provider.
trait ErasedBackend: Send + Sync {
    fn backend_name(&self) -> &str;
    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
    fn stream_erased(&self, request: CompletionRequest) -> EventStream;
}

impl<P: LlmProvider> ErasedBackend for P {
    fn backend_name(&self) -> &str {
        self.name()
    }

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.complete(request))
    }

    fn stream_erased(&self, request: CompletionRequest) -> EventStream {
        self.stream(request)
    }
}

/// The completion backend the pipeline was started with.
pub struct BoxLlmProvider {
    backend: Box<dyn ErasedBackend>,
}

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self {
            backend: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.backend.backend_name()
    }

    /// One blocking completion.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.backend.complete_erased(request).await
    }

    pub fn stream(&self, request: CompletionRequest) -> EventStream {
        self.backend.stream_erased(request)
    }
}

// Concrete providers hold HTTP clients and tokens; print only the name.
impl fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxLlmProvider")
            .field("backend", &self.name())
            .finish()
    }
}
