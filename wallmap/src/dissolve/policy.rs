use tracing::debug;

use crate::layer::{AttrValue, Layer};

/// Attribute fix-ups applied to a dissolved layer.
///
/// Steps run in order: copy the key into the display-name column, set the
/// default category, apply per-key category overrides, then select and
/// reorder columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionPolicy {
    pub name_column: Option<String>,
    pub category_column: Option<String>,
    pub default_category: Option<String>,
    /// Exact key → category replacements.
    pub overrides: Vec<(String, String)>,
    pub column_order: Option<Vec<String>>,
}

impl RegionPolicy {
    /// Policy for Spain's autonomous communities.
    pub fn spanish_communities() -> Self {
        Self {
            name_column: Some("name".to_string()),
            category_column: Some("type_en".to_string()),
            default_category: Some("Autonomous Community".to_string()),
            overrides: vec![
                ("Ceuta".to_string(), "Autonomous City".to_string()),
                ("Melilla".to_string(), "Autonomous City".to_string()),
            ],
            column_order: Some(
                ["region", "name", "region_cod", "type_en", "admin", "area_sqkm"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            ),
        }
    }

    pub fn apply(&self, mut layer: Layer, key: &str) -> Layer {
        if let Some(name_column) = &self.name_column {
            layer.add_column(name_column.as_str());
            for feature in layer.features_mut() {
                let value = feature.get(key).clone();
                feature.set(name_column.as_str(), value);
            }
        }

        if let Some(category_column) = &self.category_column {
            if let Some(default) = &self.default_category {
                layer.set_all(category_column, default.as_str());
            }
            for feature in layer.features_mut() {
                let key_value = feature.get(key).to_string();
                if let Some((_, category)) = self.overrides.iter().find(|(k, _)| *k == key_value) {
                    debug!(key = %key_value, category = %category, "Category override");
                    feature.set(category_column.as_str(), AttrValue::from(category.as_str()));
                }
            }
        }

        match &self.column_order {
            Some(order) => {
                let names: Vec<&str> = order.iter().map(String::as_str).collect();
                layer.select_columns(&names)
            }
            None => layer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Crs, Feature};
    use geo::point;

    fn community(region: &str) -> Feature {
        Feature::new(point!(x: 0.0, y: 0.0))
            .with("region", region)
            .with("name", "Province name")
            .with("type_en", "Province")
            .with("admin", "Spain")
            .with("area_sqkm", 10.0)
            .with("name_es", "Provincia")
            .with("region_cod", "ES.XX")
    }

    #[test]
    fn test_spanish_communities_policy() {
        let layer = Layer::from_features(
            Crs::Wgs84,
            [community("Andalucía"), community("Ceuta"), community("Melilla")],
        );

        let out = RegionPolicy::spanish_communities().apply(layer, "region");

        assert_eq!(
            out.columns(),
            &["region", "name", "region_cod", "type_en", "admin", "area_sqkm"]
        );
        let andalucia = &out.features()[0];
        assert_eq!(andalucia.get("name"), &AttrValue::from("Andalucía"));
        assert_eq!(andalucia.get("type_en"), &AttrValue::from("Autonomous Community"));
        assert!(andalucia.get("name_es").is_null());
        for city in &out.features()[1..] {
            assert_eq!(city.get("type_en"), &AttrValue::from("Autonomous City"));
        }
    }

    #[test]
    fn test_default_policy_is_identity() {
        let layer = Layer::from_features(Crs::Wgs84, [community("Murcia")]);
        let out = RegionPolicy::default().apply(layer.clone(), "region");
        assert_eq!(out, layer);
    }
}
