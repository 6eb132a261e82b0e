//! Single-assignment completion slots.
//!
//! A slot is the writing half of an [`Output`] whose value arrives later, typically from the
//! engine's response to a registration. The slot owns a oneshot sender; resolving it consumes
//! the sender, so a second resolution is rejected instead of overwriting the first.

use super::{Output, OutputData, OutputValue};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;

pub struct CompletionSlot<T> {
    name: String,
    sender: Mutex<Option<oneshot::Sender<Result<OutputData<T>>>>>,
}

impl<T: OutputValue> CompletionSlot<T> {
    /// Creates a slot and the output that observes it.
    ///
    /// If the slot is dropped without being resolved, waiters see
    /// [`Error::RegistrationFailed`] rather than hanging.
    pub fn new(name: impl Into<String>) -> (Self, Output<T>) {
        let name = name.into();
        let (sender, receiver) = oneshot::channel();
        let owner = name.clone();
        let output = Output::from_future(async move {
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(Error::RegistrationFailed {
                    resource: owner,
                    reason: "completion slot dropped before it was resolved".to_string(),
                }),
            }
        });
        let slot = Self {
            name,
            sender: Mutex::new(Some(sender)),
        };
        (slot, output)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Resolves the slot with data.
    pub fn resolve(&self, data: OutputData<T>) -> Result<()> {
        self.complete(Ok(data))
    }

    /// Resolves the slot to a terminal failure.
    pub fn fail(&self, error: Error) -> Result<()> {
        self.complete(Err(error))
    }

    fn complete(&self, result: Result<OutputData<T>>) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .take()
            .ok_or_else(|| Error::AlreadyResolved(self.name.clone()))?;
        // Every observer may already be gone; nothing is waiting then.
        let _ = sender.send(result);
        Ok(())
    }
}

impl<T> std::fmt::Debug for CompletionSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSlot")
            .field("name", &self.name)
            .field("resolved", &self.sender.lock().is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once() {
        let (slot, output) = CompletionSlot::<i32>::new("size");
        slot.resolve(OutputData::known(7)).unwrap();

        assert!(slot.is_resolved());
        assert_eq!(
            slot.resolve(OutputData::known(8)),
            Err(Error::AlreadyResolved("size".into()))
        );
        assert_eq!(output.value().await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn failure_is_terminal() {
        let (slot, output) = CompletionSlot::<String>::new("name");
        slot.fail(Error::Output("nope".into())).unwrap();

        assert!(slot.fail(Error::Output("again".into())).is_err());
        assert_eq!(output.resolve().await, Err(Error::Output("nope".into())));
    }

    #[tokio::test]
    async fn dropped_slot_fails_waiters() {
        let (slot, output) = CompletionSlot::<bool>::new("ready");
        drop(slot);

        let result = output.resolve().await;
        assert!(matches!(result, Err(Error::RegistrationFailed { .. })));
    }
}
