// Copyright 2025 molt contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # molt
//!
//! A mocking and spying engine for trait substitutes: stub method behavior
//! with a fluent `when(...)` API, match arguments with composable matchers,
//! and verify recorded calls — counts and ordering — after the fact.
//!
//! ## Features
//!
//! - **Fluent stubbing** - `when(|| mock.get(5)).then_return(9)` chains,
//!   with FIFO consumption and retained-last semantics
//! - **Composable matchers** - equality, ordering, string, type and custom
//!   predicates, combinable with `and`/`or`/`not`
//! - **Spying** - call-through mocks run the original body when unstubbed,
//!   recording everything either way
//! - **Verification** - call counts (`once`, `twice`, at-least/at-most) and
//!   ordered group assertions over any number of mocks
//! - **Context isolation** - matcher state and history are per-thread; stub
//!   configuration is shared, so tests never bleed into each other
//!
//! ## Quick Start
//!
//! Add `molt` to your `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! molt = "0.1"
//! ```
//!
//! A substitute routes its methods through a [`MockHandle`](mock::MockHandle);
//! everything else is driven from the [`Engine`](engine::Engine):
//!
//! ```rust
//! use molt::prelude::*;
//!
//! struct CalcMock {
//!     handle: MockHandle,
//! }
//!
//! impl CalcMock {
//!     fn new(engine: &Engine) -> Self {
//!         CalcMock {
//!             handle: engine.register_mock("Calc", false),
//!         }
//!     }
//!
//!     fn add(&self, a: i32, b: i32) -> i32 {
//!         self.handle.invoke(
//!             sig!(add(i32, i32) -> i32),
//!             vec![Value::of(a), Value::of(b)],
//!             None,
//!         )
//!     }
//! }
//!
//! let engine = Engine::new();
//! let calc = CalcMock::new(&engine);
//!
//! engine.when(|| calc.add(2, 2))?.then_return(5i32);
//! assert_eq!(calc.add(2, 2), 5);
//! assert_eq!(calc.add(1, 1), 0); // unstubbed: zero default
//!
//! engine.assert_mock(|| calc.add(2, 2))?.was_called_once()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`engine`] - The [`Engine`](engine::Engine), monitoring blocks, dispatch
//! - [`mock`] - The substitute-side interception contract
//! - [`matchers`] - Argument matchers and the per-context matcher stack
//! - [`stubs`] - The stub registry and the fluent stubbing chain
//! - [`invocation`] - Recorded calls, templates, and argument matching
//! - [`verify`] - Call-count and ordering assertions
//! - [`Error`] and [`Result`] - Engine-fault handling

#[macro_use]
mod macros;

mod error;

/// The mocking engine, monitoring blocks, and call dispatch.
///
/// [`Engine`](engine::Engine) is the entry point for everything: registering
/// mocks, stubbing (`when`), verifying (`assert_mock`/`assert_mocks`), and
/// resetting state. The engine owns one isolated context per thread plus the
/// shared stub registry.
pub mod engine;

/// Invocations, call templates, and argument matching.
pub mod invocation;

/// Argument matchers and the per-context matcher stack.
pub mod matchers;

/// Mock handles and the substitute-side interception contract.
pub mod mock;

/// Common imports for working with molt.
pub mod prelude;

/// The stub registry and the fluent stubbing surface.
pub mod stubs;

/// Erased values, method signatures, and default-value provisioning.
pub mod types;

/// Verification of recorded calls against monitored templates.
pub mod verify;

pub use error::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
