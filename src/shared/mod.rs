pub mod formatters;
pub mod insensitive_dict;
pub mod sanitise_text;
