pub mod description;
pub mod sexp;

// Re-export for convenience
pub use description::{
    Connection, DescriptionError, DescriptionFormat, DesignDescription, MergeDef, Naming,
    PartDef, PinAddress, TemplateDef,
};
pub use sexp::{ParseError, SExp, SExpParser};
