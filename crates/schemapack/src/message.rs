// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Top-level dispatchable values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A native value that can travel as a framed message.
///
/// Implement with [`impl_message!`](crate::impl_message).
pub trait Message: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Schema path of the value, for native types shared by several schema
    /// types. Statically laid out types return `None` and are found by
    /// their Rust type.
    fn schema_type(&self) -> Option<&str> {
        None
    }
}

impl dyn Message {
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Message>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn downcast<T: Message>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// Builds an empty message for decoding.
pub type MessageFactory = Arc<dyn Fn() -> Box<dyn Message> + Send + Sync>;

/// Implement [`Message`] for one or more types.
///
/// ```
/// #[derive(Debug, Default)]
/// struct Ping {
///     seq: u32,
/// }
/// schemapack::impl_message!(Ping);
/// ```
#[macro_export]
macro_rules! impl_message {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Message for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }

                fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                    self
                }
            }
        )+
    };
}
