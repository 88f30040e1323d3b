use std::future::Future;
use std::sync::Arc;

use super::config::RequestKind;

/// One unit of work against the target, borrowed from the worker's input cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call<'a> {
    AccountInfo { account: &'a str },
    MultipleAccounts { accounts: &'a [Arc<str>] },
    ProgramAccounts { program: &'a str },
}

impl Call<'_> {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::AccountInfo { .. } => RequestKind::AccountInfo,
            Self::MultipleAccounts { .. } => RequestKind::MultipleAccounts,
            Self::ProgramAccounts { .. } => RequestKind::ProgramAccounts,
        }
    }

    /// Number of identifiers carried by this call.
    pub fn input_len(&self) -> usize {
        match self {
            Self::AccountInfo { .. } | Self::ProgramAccounts { .. } => 1,
            Self::MultipleAccounts { accounts } => accounts.len(),
        }
    }
}

/// Performs remote calls for the worker pool.
///
/// The pool only looks at `Ok`/`Err` and the wall-clock time spent awaiting the
/// returned future; response payloads are never interpreted.
pub trait Invoker: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn invoke(&self, call: Call<'_>) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Adapts a closure into an [`Invoker`]. The closure's future must not borrow the call.
pub struct FnInvoker<F> {
    f: F,
}

impl<F, Fut, E> FnInvoker<F>
where
    F: Fn(Call<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, E> Invoker for FnInvoker<F>
where
    F: Fn(Call<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn invoke(&self, call: Call<'_>) -> impl Future<Output = Result<(), E>> + Send {
        (self.f)(call)
    }
}

impl<F> std::fmt::Debug for FnInvoker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInvoker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_reports_kind_and_len() {
        let batch: Vec<Arc<str>> = vec![Arc::from("A"), Arc::from("B")];
        let call = Call::MultipleAccounts { accounts: &batch };
        assert_eq!(call.kind(), RequestKind::MultipleAccounts);
        assert_eq!(call.input_len(), 2);

        let call = Call::ProgramAccounts { program: "P" };
        assert_eq!(call.kind(), RequestKind::ProgramAccounts);
        assert_eq!(call.input_len(), 1);
    }
}
