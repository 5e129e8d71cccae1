//! A JSONata query and transformation language engine.
//!
//! ```
//! use jsonata_rs::{JsonAta, Options};
//!
//! let jsonata = JsonAta::new("Account.Order[0].Product.Price", &Options::default()).unwrap();
//! let input = serde_json::json!({
//!     "Account": {"Order": [{"Product": {"Price": 12.5}}]}
//! });
//! let result = jsonata.evaluate(Some(&input), &Options::default()).unwrap();
//! assert_eq!(result, Some(serde_json::json!(12.5)));
//! ```

mod ast;
mod environment;
mod error;
mod evaluator;
mod jsonata;
mod lexer;
mod options;
mod parser;
mod position;
pub mod schema;
mod token;
mod value;

pub use ast::Node;
pub use environment::Environment;
pub use error::{Error, Result};
pub use jsonata::{evaluate, parse, JsonAta};
pub use options::{CancellationToken, Options};
pub use position::Position;
pub use schema::TestCase;
pub use value::Value;
