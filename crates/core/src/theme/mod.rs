mod types;
mod validation;

pub use types::{ColorScheme, SetTheme, COLOR_SCHEME_KEY};
pub use validation::{decode_form_data, ValidationErrors};
