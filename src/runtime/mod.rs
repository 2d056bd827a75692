//! Runtime value kernel: values, the string pool and the operations the compiler folds with

pub mod arith;
pub mod compare;
pub mod justify;
pub mod stringpool;
pub mod value;

pub use arith::{idiv, integer_divide};
pub use compare::{equals, not_equals, sql_not_equals};
pub use justify::{justify, zjustify};
pub use stringpool::{GrowthPolicy, MStr, PoolOptions, Region, SideTable, StringPool, MAX_STRLEN};
pub use value::{Decimal, Mval, NumCache, Number};
