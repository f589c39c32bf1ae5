//! Seed the catalog from a YAML file.
//!
//! Categories and products are upserted by slug, so re-running a seed file
//! updates prices and stock in place. Prices are quoted decimal strings.
//!
//! ```yaml
//! categories:
//!   - name: Rings
//!     slug: rings
//! products:
//!   - name: Silver Band
//!     slug: silver-band
//!     sku: RNG-001
//!     category: rings
//!     original_price: "60.00"
//!     discounted_price: "45.00"
//!     stock: 12
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lustre_core::Money;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Category slug, declared in the same file.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub original_price: Option<Money>,
    #[serde(default)]
    pub discounted_price: Option<Money>,
    #[serde(default)]
    pub deal_price: Option<Money>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deal: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_true() -> bool {
    true
}

impl ProductSeed {
    fn prices(&self) -> [(&'static str, Option<Money>); 3] {
        [
            ("original_price", self.original_price),
            ("discounted_price", self.discounted_price),
            ("deal_price", self.deal_price),
        ]
    }
}

/// Check a parsed seed file, returning one message per problem.
#[must_use]
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let mut category_slugs = HashSet::new();
    for category in &seed.categories {
        if category.name.trim().is_empty() {
            errors.push(format!("category '{}': name is empty", category.slug));
        }
        if category.slug.trim().is_empty() {
            errors.push(format!("category '{}': slug is empty", category.name));
        } else if !category_slugs.insert(category.slug.as_str()) {
            errors.push(format!("category '{}': duplicate slug", category.slug));
        }
    }

    let mut product_slugs = HashSet::new();
    let mut skus = HashSet::new();
    for product in &seed.products {
        let slug = product.slug.as_str();
        if product.name.trim().is_empty() {
            errors.push(format!("product '{slug}': name is empty"));
        }
        if slug.trim().is_empty() {
            errors.push(format!("product '{}': slug is empty", product.name));
        } else if !product_slugs.insert(slug) {
            errors.push(format!("product '{slug}': duplicate slug"));
        }
        if let Some(sku) = product.sku.as_deref()
            && !skus.insert(sku)
        {
            errors.push(format!("product '{slug}': duplicate sku '{sku}'"));
        }
        if let Some(category) = product.category.as_deref()
            && !category_slugs.contains(category)
        {
            errors.push(format!("product '{slug}': unknown category '{category}'"));
        }
        if product.original_price.is_none() && product.discounted_price.is_none() {
            errors.push(format!(
                "product '{slug}': needs original_price or discounted_price"
            ));
        }
        for (field, price) in product.prices() {
            if price.is_some_and(|p| p.is_negative()) {
                errors.push(format!("product '{slug}': {field} is negative"));
            }
        }
        if product.stock < 0 {
            errors.push(format!("product '{slug}': stock is negative"));
        }
    }

    errors
}

/// Seed categories and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails. Nothing is written unless every row succeeds.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed catalog"
    );

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    for product in seed.products.iter().filter(|p| p.deal_price.is_some() && !p.is_deal) {
        warn!(slug = %product.slug, "deal_price is ignored until is_deal is set");
    }

    if dry_run {
        info!("Dry run: catalog is valid, nothing written");
        return Ok(());
    }

    let pool = super::connect().await?;
    upsert(&pool, &seed).await?;

    info!("Seeding complete!");
    info!("  Categories upserted: {}", seed.categories.len());
    info!("  Products upserted: {}", seed.products.len());
    Ok(())
}

async fn upsert(pool: &PgPool, seed: &CatalogSeed) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut category_ids = HashMap::new();
    for category in &seed.categories {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(category.name.trim())
        .bind(category.slug.trim())
        .fetch_one(&mut *tx)
        .await?;
        category_ids.insert(category.slug.as_str(), id);
    }

    for product in &seed.products {
        let category_id = product
            .category
            .as_deref()
            .and_then(|slug| category_ids.get(slug).copied());

        sqlx::query(
            "INSERT INTO products (name, slug, sku, category_id, original_price, \
                 discounted_price, deal_price, stock, is_active, is_deal, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, sku = EXCLUDED.sku, category_id = EXCLUDED.category_id, \
                 original_price = EXCLUDED.original_price, \
                 discounted_price = EXCLUDED.discounted_price, \
                 deal_price = EXCLUDED.deal_price, stock = EXCLUDED.stock, \
                 is_active = EXCLUDED.is_active, is_deal = EXCLUDED.is_deal, \
                 is_featured = EXCLUDED.is_featured, updated_at = NOW()",
        )
        .bind(product.name.trim())
        .bind(product.slug.trim())
        .bind(product.sku.as_deref())
        .bind(category_id)
        .bind(product.original_price.map(Money::rounded))
        .bind(product.discounted_price.map(Money::rounded))
        .bind(product.deal_price.map(Money::rounded))
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.is_deal)
        .bind(product.is_featured)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const CATALOG: &str = r#"
categories:
  - name: Rings
    slug: rings
products:
  - name: Silver Band
    slug: silver-band
    sku: RNG-001
    category: rings
    original_price: "60.00"
    discounted_price: "45.00"
    stock: 12
  - name: Gold Hoops
    slug: gold-hoops
    original_price: "120.00"
    deal_price: "90.00"
    is_deal: true
"#;

    fn parse(yaml: &str) -> CatalogSeed {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_catalog() {
        let seed = parse(CATALOG);
        assert_eq!(seed.categories.len(), 1);
        assert_eq!(seed.products.len(), 2);

        let band = &seed.products[0];
        assert_eq!(band.discounted_price, Some(Money::new(dec!(45.00))));
        assert_eq!(band.stock, 12);
        assert!(band.is_active);
        assert!(!band.is_deal);

        let hoops = &seed.products[1];
        assert_eq!(hoops.stock, 0);
        assert!(hoops.is_deal);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<CatalogSeed, _> =
            serde_yaml::from_str("products:\n  - name: A\n    slug: a\n    price: \"1\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed = parse(
            r#"
categories:
  - name: Rings
    slug: rings
  - name: More Rings
    slug: rings
products:
  - name: No Price
    slug: no-price
    category: necklaces
  - name: Negative
    slug: negative
    original_price: "-1.00"
    stock: -2
  - name: Twin
    slug: negative
    discounted_price: "5.00"
"#,
        );
        let errors = validate(&seed);

        assert!(errors.contains(&"category 'rings': duplicate slug".to_string()));
        assert!(errors.contains(&"product 'no-price': unknown category 'necklaces'".to_string()));
        assert!(
            errors.contains(&"product 'no-price': needs original_price or discounted_price".to_string())
        );
        assert!(errors.contains(&"product 'negative': original_price is negative".to_string()));
        assert!(errors.contains(&"product 'negative': stock is negative".to_string()));
        assert!(errors.contains(&"product 'negative': duplicate slug".to_string()));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_empty_file_is_valid() {
        assert!(validate(&CatalogSeed::default()).is_empty());
    }
}
