//! Product domain types.

use thinkpad_store_core::{Price, ProductId};

use crate::error::ValidationErrors;

/// A catalogue entry.
///
/// `image` and `images` hold paths relative to the media root. An empty
/// `image` means the product has no picture.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub model: String,
    pub price: Price,
    pub description: String,
    pub stock: i32,
    pub image: String,
    pub images: Vec<String>,
}

/// Validated product fields for create, update and seed operations.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub model: String,
    pub price: Price,
    pub description: String,
    pub stock: i32,
}

impl ProductInput {
    /// Longest accepted product name.
    pub const MAX_NAME_CHARS: usize = 255;
    /// Longest accepted model string.
    pub const MAX_MODEL_CHARS: usize = 100;

    /// Validate raw text fields, collecting every problem by field.
    ///
    /// `description` may be omitted or blank; every other field is required.
    ///
    /// # Errors
    ///
    /// Returns the field → messages map when any field is missing or invalid.
    pub fn validate(draft: &ProductDraft) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", draft.name.as_deref(), Self::MAX_NAME_CHARS);
        let model = required_text(
            &mut errors,
            "model",
            draft.model.as_deref(),
            Self::MAX_MODEL_CHARS,
        );
        let price = errors
            .require("price", draft.price.as_deref())
            .and_then(|raw| {
                Price::parse(raw)
                    .map_err(|e| errors.add("price", e.to_string()))
                    .ok()
            });
        let stock = errors
            .require("stock", draft.stock.as_deref())
            .and_then(|raw| match raw.trim().parse::<i32>() {
                Ok(stock) if stock >= 0 => Some(stock),
                Ok(_) => {
                    errors.add("stock", "Ensure this value is greater than or equal to 0.");
                    None
                }
                Err(_) => {
                    errors.add("stock", "A valid integer is required.");
                    None
                }
            });

        match (name, model, price, stock) {
            (Some(name), Some(model), Some(price), Some(stock)) if errors.is_empty() => Ok(Self {
                name,
                model,
                price,
                description: draft.description.clone().unwrap_or_default(),
                stock,
            }),
            _ => Err(errors),
        }
    }
}

/// Unvalidated product fields as submitted by a form or a seed file.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub model: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub stock: Option<String>,
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Option<String> {
    let value = errors.require(field, value)?.trim();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }
    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_chars} characters."),
        );
        return None;
    }
    Some(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(price: &str, stock: &str) -> ProductDraft {
        ProductDraft {
            name: Some(" ThinkPad X1 Carbon ".to_string()),
            model: Some("Gen 12".to_string()),
            price: Some(price.to_string()),
            description: None,
            stock: Some(stock.to_string()),
        }
    }

    #[test]
    fn test_validate_product() {
        let input = ProductInput::validate(&draft("12999", "4")).unwrap();
        assert_eq!(input.name, "ThinkPad X1 Carbon");
        assert_eq!(input.price.to_string(), "12999.00");
        assert_eq!(input.stock, 4);
        assert_eq!(input.description, "");
    }

    #[test]
    fn test_validate_product_collects_errors() {
        let errors = ProductInput::validate(&ProductDraft {
            name: Some("   ".to_string()),
            model: Some("m".repeat(101)),
            ..draft("1.999", "-1")
        })
        .unwrap_err();

        assert_eq!(errors.messages("name"), ["This field may not be blank."]);
        assert_eq!(
            errors.messages("model"),
            ["Ensure this field has no more than 100 characters."]
        );
        assert_eq!(
            errors.messages("price"),
            ["Ensure that there are no more than 2 decimal places."]
        );
        assert_eq!(
            errors.messages("stock"),
            ["Ensure this value is greater than or equal to 0."]
        );
    }

    #[test]
    fn test_validate_product_requires_fields() {
        let errors = ProductInput::validate(&ProductDraft::default()).unwrap_err();
        for field in ["name", "model", "price", "stock"] {
            assert_eq!(errors.messages(field), ["This field is required."]);
        }
        assert!(errors.messages("description").is_empty());
    }
}
