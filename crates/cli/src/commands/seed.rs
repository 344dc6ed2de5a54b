//! Seed the product catalogue from a YAML file.
//!
//! Products are matched on `(name, model)`: existing rows are updated, new
//! ones inserted, so the command can be re-run safely.
//!
//! ```yaml
//! products:
//!   - name: ThinkPad X1 Carbon
//!     model: Gen 12
//!     price: 12999.00
//!     description: 14" business ultrabook
//!     stock: 20
//!     image: product_images/x1_carbon.png   # optional, relative to the media root
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{error, info};

use thinkpad_store_server::db::{self, ProductRepository};
use thinkpad_store_server::models::{ProductDraft, ProductInput};

use super::database_url;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry. Scalars may be written as YAML numbers or strings.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub model: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub stock: Value,
    pub image: Option<String>,
}

impl SeedProduct {
    fn draft(&self) -> ProductDraft {
        ProductDraft {
            name: scalar_text(&self.name),
            model: scalar_text(&self.model),
            price: scalar_text(&self.price),
            description: scalar_text(&self.description),
            stock: scalar_text(&self.stock),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Validate every entry, reporting each failure as `#index: problems`.
///
/// # Errors
///
/// Returns the list of problems when any entry is invalid.
pub fn validate(file: &SeedFile) -> Result<Vec<(ProductInput, Option<&str>)>, Vec<String>> {
    let mut inputs = Vec::with_capacity(file.products.len());
    let mut problems = Vec::new();

    for (index, product) in file.products.iter().enumerate() {
        match ProductInput::validate(&product.draft()) {
            Ok(input) => inputs.push((input, product.image.as_deref().filter(|i| !i.is_empty()))),
            Err(errors) => problems.push(format!("#{index}: {errors}")),
        }
    }

    if problems.is_empty() {
        Ok(inputs)
    } else {
        Err(problems)
    }
}

/// Upsert the products listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or database operations fail.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    info!(products = file.products.len(), "Parsed seed file");

    let inputs = match validate(&file) {
        Ok(inputs) => inputs,
        Err(problems) => {
            error!("Seed file validation failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(format!("{} invalid products", problems.len()).into());
        }
    };

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = ProductRepository::new(&pool);
    let (mut created, mut updated) = (0usize, 0usize);
    for (input, image) in &inputs {
        let (product, was_created) = repo.upsert_by_name_and_model(input, *image).await?;
        if was_created {
            created += 1;
        } else {
            updated += 1;
        }
        info!(product_id = %product.id, name = %product.name, created = was_created, "Seeded product");
    }

    info!("Seeding complete!");
    info!("  Products created: {created}");
    info!("  Products updated: {updated}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
products:
  - name: ThinkPad X1 Carbon
    model: Gen 12
    price: 12999.00
    description: Business ultrabook
    stock: 20
    image: product_images/x1.png
  - name: ThinkPad E14
    model: Gen 6
    price: "4299.50"
    stock: 5
"#;

    #[test]
    fn test_parse_and_validate() {
        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let inputs = validate(&file).unwrap();

        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].0.name, "ThinkPad X1 Carbon");
        assert_eq!(inputs[0].0.price.to_string(), "12999.00");
        assert_eq!(inputs[0].1, Some("product_images/x1.png"));
        assert_eq!(inputs[1].0.description, "");
        assert_eq!(inputs[1].0.stock, 5);
        assert_eq!(inputs[1].1, None);
    }

    #[test]
    fn test_invalid_entries_are_reported_by_index() {
        let file: SeedFile = serde_yaml::from_str(
            r"
products:
  - name: Fine
    model: T14
    price: 1
    stock: 1
  - name: Broken
    model: T14
    price: -3
    stock: many
",
        )
        .unwrap();

        let problems = validate(&file).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("#1: "));
        assert!(problems[0].contains("stock"));
    }
}
