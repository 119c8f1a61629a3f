mod builtin;
pub mod builtin_entity_parser;
pub mod custom_entity_parser;

pub use self::builtin_entity_parser::{BuiltinEntityParser, RuleBasedBuiltinEntityParser};
pub use self::custom_entity_parser::{CustomEntity, CustomEntityParser, TableCustomEntityParser};
