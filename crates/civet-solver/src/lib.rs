// lib.rs
//! Symbol resolution over the metadata store: name-to-FQN expansion,
//! inheritance-chain member lookup with cycle protection, and
//! best-effort expression typing.

pub mod expr_type;
pub mod names;
pub mod oop;
pub mod state;

pub use expr_type::{
    class_tokens, expr_type, expr_type_custom, resolve_type_set, CustomType,
};
pub use names::{resolve_class_name, resolve_constant, resolve_function};
pub use oop::{can_access, find_constant, find_method, find_property, has_magic_method, implements};
pub use state::ClassParseState;
