//! # Outputs
//!
//! An [`Output<T>`] is a deployment-time value that may not exist yet. It carries:
//!
//! - the value itself, absent while the value is **unknown** (e.g. during a preview),
//! - a **secret** flag that is monotonic: anything derived from a secret is secret,
//! - the set of **resources** the value depends on.
//!
//! The dependency set survives every combinator, even when the value is unknown. When an
//! output becomes the property of a new resource, the registration request must declare
//! which resources that property depended on, whether or not the value was ever known.
//!
//! Failure is not unknown. A computation that fails propagates its [`Error`] through
//! every combinator built on top of it.
//!
//! ```rust
//! use iac_framework::Output;
//!
//! #[tokio::main]
//! async fn main() {
//!     let size = Output::create(1).map(|x| x + 1);
//!     let data = size.resolve().await.unwrap();
//!     assert_eq!(data.value, Some(2));
//!     assert!(!data.is_secret);
//!     assert!(data.resources.is_empty());
//! }
//! ```

pub mod completion;

pub use completion::CompletionSlot;

use crate::error::{Error, Result};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

/// Index of a resource in the deployment's resource store.
///
/// Outputs hold these instead of resource handles: a dependency is a reference used for
/// ordering, never ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marker trait for types that can live inside an [`Output`].
///
/// Shared futures hand a clone of the result to every waiter, so values must be `Clone`.
pub trait OutputValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> OutputValue for T {}

/// The resolved state of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputData<T> {
    /// `None` while the value is unknown.
    pub value: Option<T>,
    pub is_secret: bool,
    pub resources: BTreeSet<ResourceId>,
}

impl<T> OutputData<T> {
    pub fn new(value: Option<T>, is_secret: bool, resources: BTreeSet<ResourceId>) -> Self {
        Self {
            value,
            is_secret,
            resources,
        }
    }

    /// A known, non-secret value with no dependencies.
    pub fn known(value: T) -> Self {
        Self::new(Some(value), false, BTreeSet::new())
    }

    pub fn unknown() -> Self {
        Self::new(None, false, BTreeSet::new())
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }

    pub fn with_secret(mut self, is_secret: bool) -> Self {
        self.is_secret |= is_secret;
        self
    }

    pub fn with_resources(mut self, resources: impl IntoIterator<Item = ResourceId>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Applies `f` to a known value. Knownness, secrecy and dependencies are copied as-is.
    pub fn map_value<U>(self, f: impl FnOnce(T) -> U) -> OutputData<U> {
        OutputData {
            value: self.value.map(f),
            is_secret: self.is_secret,
            resources: self.resources,
        }
    }
}

type DataFuture<T> = Shared<BoxFuture<'static, Result<OutputData<T>>>>;

/// An asynchronous, dependency- and secrecy-aware value.
///
/// Cloning is cheap: all clones observe the same underlying computation, which runs at
/// most once.
pub struct Output<T> {
    data: DataFuture<T>,
}

impl<T: OutputValue> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output<{}>", std::any::type_name::<T>())
    }
}

impl<T: OutputValue> From<T> for Output<T> {
    fn from(value: T) -> Self {
        Output::create(value)
    }
}

impl<T: OutputValue> Output<T> {
    pub(crate) fn from_future(
        future: impl Future<Output = Result<OutputData<T>>> + Send + 'static,
    ) -> Self {
        Self {
            data: future.boxed().shared(),
        }
    }

    /// Wraps already-resolved data.
    pub fn from_data(data: OutputData<T>) -> Self {
        Self::from_future(future::ready(Ok(data)))
    }

    /// A known, non-secret value with no dependencies.
    pub fn create(value: T) -> Self {
        Self::from_data(OutputData::known(value))
    }

    /// A known value marked secret.
    pub fn create_secret(value: T) -> Self {
        Self::from_data(OutputData::known(value).with_secret(true))
    }

    /// A value that is not known yet (e.g. a computed property during a preview).
    pub fn unknown() -> Self {
        Self::from_data(OutputData::unknown())
    }

    /// An output whose computation failed.
    pub fn failed(error: Error) -> Self {
        Self::from_future(future::ready(Err(error)))
    }

    /// Builds a known output from an async computation. `resources` are added to the
    /// result's dependencies.
    pub fn from_async<I, F>(resources: I, computation: F) -> Self
    where
        I: IntoIterator<Item = ResourceId>,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let resources: BTreeSet<ResourceId> = resources.into_iter().collect();
        Self::from_future(async move {
            let value = computation.await?;
            Ok(OutputData::known(value).with_resources(resources))
        })
    }

    /// Transforms the value. `f` only runs when the value is known; the result keeps the
    /// knownness, secrecy and dependencies of `self`.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let data = self.data.clone();
        Output::from_future(async move { Ok(data.await?.map_value(f)) })
    }

    /// Chains a computation that itself produces an output.
    ///
    /// The result depends on both the outer and (when `f` runs) the inner output. It is
    /// known only if both are known and secret if either is secret.
    #[doc(alias = "bind")]
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> Output<U> + Send + 'static,
    {
        let data = self.data.clone();
        Output::from_future(async move {
            let OutputData {
                value,
                is_secret,
                resources,
            } = data.await?;
            let Some(value) = value else {
                return Ok(OutputData::new(None, is_secret, resources));
            };
            let inner = f(value).data.await?;
            Ok(OutputData {
                value: inner.value,
                is_secret: is_secret || inner.is_secret,
                resources: resources.into_iter().chain(inner.resources).collect(),
            })
        })
    }

    /// Combines many outputs into one output of a vector.
    ///
    /// Known iff every input is known, secret iff any input is secret, and dependent on
    /// the union of all inputs' dependencies. The first failure fails the result.
    pub fn combine(outputs: impl IntoIterator<Item = Output<T>>) -> Output<Vec<T>> {
        let futures: Vec<_> = outputs.into_iter().map(|o| o.data).collect();
        Output::from_future(async move {
            let all = future::try_join_all(futures).await?;
            let mut values = Some(Vec::with_capacity(all.len()));
            let mut is_secret = false;
            let mut resources = BTreeSet::new();
            for data in all {
                is_secret |= data.is_secret;
                resources.extend(data.resources);
                match (values.as_mut(), data.value) {
                    (Some(values), Some(value)) => values.push(value),
                    _ => values = None,
                }
            }
            Ok(OutputData::new(values, is_secret, resources))
        })
    }

    /// Pairs two outputs of different types.
    pub fn tuple<U: OutputValue>(&self, other: &Output<U>) -> Output<(T, U)> {
        let left = self.data.clone();
        let right = other.data.clone();
        Output::from_future(async move {
            let (left, right) = future::try_join(left, right).await?;
            let value = left.value.zip(right.value);
            Ok(OutputData::new(
                value,
                left.is_secret || right.is_secret,
                left.resources.into_iter().chain(right.resources).collect(),
            ))
        })
    }

    /// The same value, marked secret.
    pub fn as_secret(&self) -> Output<T> {
        let data = self.data.clone();
        Output::from_future(async move { Ok(data.await?.with_secret(true)) })
    }

    /// Adds dependencies to the value.
    pub fn with_resources(&self, resources: impl IntoIterator<Item = ResourceId>) -> Output<T> {
        let data = self.data.clone();
        let resources: Vec<ResourceId> = resources.into_iter().collect();
        Output::from_future(async move { Ok(data.await?.with_resources(resources)) })
    }

    /// Awaits the underlying data.
    ///
    /// Programs compose outputs with [`Output::map`] and [`Output::apply`]; this is where
    /// the registration layer (and tests) observe the value, its flags and dependencies.
    pub async fn resolve(&self) -> Result<OutputData<T>> {
        self.data.clone().await
    }

    pub async fn is_known(&self) -> Result<bool> {
        Ok(self.resolve().await?.is_known())
    }

    pub async fn is_secret(&self) -> Result<bool> {
        Ok(self.resolve().await?.is_secret)
    }

    /// The value, or `None` while unknown.
    pub async fn value(&self) -> Result<Option<T>> {
        Ok(self.resolve().await?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn map_skips_unknown_values() {
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = called.clone();
        let mapped = Output::<i32>::unknown().map(move |x| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            x + 1
        });

        let data = mapped.resolve().await.unwrap();
        assert!(!data.is_known());
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_values_keep_dependencies() {
        let unknown = Output::<String>::from_data(
            OutputData::unknown().with_resources([ResourceId(3), ResourceId(5)]),
        );
        let data = unknown.map(|s| s.len()).resolve().await.unwrap();
        assert!(!data.is_known());
        assert_eq!(
            data.resources,
            BTreeSet::from([ResourceId(3), ResourceId(5)])
        );
    }

    #[tokio::test]
    async fn failures_are_not_unknowns() {
        let failed = Output::<i32>::failed(Error::Output("boom".into()));
        let combined = Output::combine([Output::create(1), failed.map(|x| x * 2)]);
        assert_eq!(
            combined.resolve().await,
            Err(Error::Output("boom".into()))
        );
    }
}
