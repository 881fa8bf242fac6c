pub mod category;
pub mod clause;
pub mod reduce;
pub mod terms;

pub use category::{
    CATEGORY_RULES, Category, CategoryRule, UnknownCategory, detect_category, detect_with,
};
pub use clause::ClauseRecord;
pub use reduce::{
    DEFAULT_MAX_LENGTH, ReducerConfig, Reduction, ReductionKind, TRUNCATION_MARKER, reduce,
    reduce_blocks,
};
pub use terms::{ReducedBlock, TermsBlock};
