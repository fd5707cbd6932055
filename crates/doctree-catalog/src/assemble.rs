//! Populate an `EntityCatalogue` and a `RecordStore` from collaborator sources.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::model::{EntityCatalogue, FieldMeta, MandatoryMapping};
use crate::record::RecordStore;
use crate::source::{MetadataSource, ProgressSink, RecordSource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueOptions {
    /// Restrict listing to one module.
    #[serde(default)]
    pub module: Option<String>,
    /// Entity types left out of the catalogue entirely.
    #[serde(default)]
    pub ignored_entity_types: Vec<String>,
}

/// Fields that reach the tree: not hidden and not a layout break.
pub fn keep_field(field: &FieldMeta) -> bool {
    !field.hidden && !field.is_layout()
}

/// List parent types, then child types, and fetch the kept fields of each.
pub fn assemble_catalogue(
    source: &dyn MetadataSource,
    options: &CatalogueOptions,
    progress: &mut dyn ProgressSink,
) -> Result<EntityCatalogue, CatalogError> {
    let ignored: HashSet<&str> = options
        .ignored_entity_types
        .iter()
        .map(String::as_str)
        .collect();
    let module = options.module.as_deref();

    let mut catalogue = EntityCatalogue::new();
    for is_child in [false, true] {
        let types = source.list_entity_types(module, is_child)?;
        progress.emit(&format!(
            "listing {} {} entity types",
            types.len(),
            if is_child { "child" } else { "parent" }
        ));

        for entity in types {
            if ignored.contains(entity.name.as_str()) {
                tracing::debug!(entity = %entity.name, "ignored entity type");
                continue;
            }
            if catalogue.contains(&entity.name) {
                tracing::warn!(entity = %entity.name, "entity type listed twice; keeping first");
                continue;
            }
            let fields: Vec<FieldMeta> = source
                .list_fields(&entity.name, is_child)?
                .into_iter()
                .filter(keep_field)
                .collect();
            catalogue.insert(entity.name, fields);
        }
    }

    progress.emit(&format!(
        "catalogue ready: {} entity types, {} fields",
        catalogue.len(),
        catalogue.field_count()
    ));
    Ok(catalogue)
}

/// Fetch every record of every catalogue type. A type named as the child of a
/// mandatory mapping is listed with that mapping's filters (first mapping wins).
pub fn collect_records(
    source: &dyn RecordSource,
    catalogue: &EntityCatalogue,
    mappings: &[MandatoryMapping],
    progress: &mut dyn ProgressSink,
) -> Result<RecordStore, CatalogError> {
    let mut store = RecordStore::new();
    for entity in catalogue.names() {
        let filters = mappings
            .iter()
            .find(|m| m.child == entity)
            .map(|m| m.filters.as_slice())
            .unwrap_or(&[]);

        let keys = source.list_keys(entity, filters)?;
        let records = keys
            .iter()
            .map(|id| source.get_record(entity, id))
            .collect::<Result<Vec<_>, _>>()?;

        progress.emit(&format!("fetched {} records of {entity}", records.len()));
        store.insert(entity, records);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordFilter;
    use crate::record::Record;
    use crate::source::EntityTypeRef;
    use std::collections::HashMap;

    struct FakeSource {
        types: Vec<EntityTypeRef>,
        fields: HashMap<String, Vec<FieldMeta>>,
        records: HashMap<String, Vec<Record>>,
    }

    impl MetadataSource for FakeSource {
        fn list_entity_types(
            &self,
            module: Option<&str>,
            is_child: bool,
        ) -> Result<Vec<EntityTypeRef>, CatalogError> {
            Ok(self
                .types
                .iter()
                .filter(|t| t.istable == is_child)
                .filter(|t| module.map_or(true, |m| t.module.as_deref() == Some(m)))
                .cloned()
                .collect())
        }

        fn list_fields(
            &self,
            name: &str,
            include_parent_column: bool,
        ) -> Result<Vec<FieldMeta>, CatalogError> {
            let mut fields = self
                .fields
                .get(name)
                .cloned()
                .ok_or_else(|| CatalogError::unavailable(name, "no such type"))?;
            if include_parent_column {
                for f in &mut fields {
                    f.parent = Some(name.to_string());
                }
            }
            Ok(fields)
        }
    }

    impl RecordSource for FakeSource {
        fn list_keys(
            &self,
            name: &str,
            filters: &[RecordFilter],
        ) -> Result<Vec<String>, CatalogError> {
            Ok(self
                .records
                .get(name)
                .into_iter()
                .flatten()
                .filter(|r| filters.iter().all(|f| f.matches(r)))
                .filter_map(|r| r.name.clone())
                .collect())
        }

        fn get_record(&self, name: &str, id: &str) -> Result<Record, CatalogError> {
            self.records
                .get(name)
                .and_then(|rs| rs.iter().find(|r| r.name.as_deref() == Some(id)))
                .cloned()
                .ok_or_else(|| CatalogError::unavailable(name, id))
        }
    }

    fn entity(name: &str, module: &str, istable: bool) -> EntityTypeRef {
        EntityTypeRef {
            name: name.to_string(),
            module: Some(module.to_string()),
            istable,
        }
    }

    fn fake() -> FakeSource {
        let mut hidden = FieldMeta::new("secret", "Data");
        hidden.hidden = true;

        FakeSource {
            types: vec![
                entity("Contract Item", "Contracts", true),
                entity("Contract", "Contracts", false),
                entity("Note", "Other", false),
                entity("Audit", "Contracts", false),
            ],
            fields: HashMap::from([
                (
                    "Contract".to_string(),
                    vec![
                        FieldMeta::new("amount", "Currency"),
                        FieldMeta::new("sb1", "Section Break"),
                        hidden,
                        FieldMeta::new("items", "Table").with_options("Contract Item"),
                    ],
                ),
                ("Contract Item".to_string(), vec![FieldMeta::new("qty", "Int")]),
                ("Note".to_string(), vec![]),
                ("Audit".to_string(), vec![]),
            ]),
            records: HashMap::from([
                (
                    "Contract".to_string(),
                    vec![Record::new("C1"), Record::new("C2").with("status", "Draft")],
                ),
                (
                    "Audit".to_string(),
                    vec![
                        Record::new("A1").with("kind", "contract"),
                        Record::new("A2").with("kind", "invoice"),
                    ],
                ),
            ]),
        }
    }

    #[test]
    fn parents_come_before_children_and_filters_apply() {
        let options = CatalogueOptions {
            module: Some("Contracts".into()),
            ignored_entity_types: vec!["Audit".into()],
        };
        let mut lines: Vec<String> = Vec::new();
        let catalogue = assemble_catalogue(&fake(), &options, &mut lines).unwrap();

        let names: Vec<_> = catalogue.names().collect();
        assert_eq!(names, ["Contract", "Contract Item"]);

        let contract: Vec<_> = catalogue
            .fields("Contract")
            .unwrap()
            .iter()
            .map(|f| f.fieldname.as_str())
            .collect();
        assert_eq!(contract, ["amount", "items"]);

        let item = &catalogue.fields("Contract Item").unwrap()[0];
        assert_eq!(item.parent.as_deref(), Some("Contract Item"));
        assert!(lines.last().unwrap().starts_with("catalogue ready: 2 entity types"));
    }

    #[test]
    fn records_use_first_mapping_filters() {
        let source = fake();
        let catalogue = EntityCatalogue::new()
            .with_entity("Contract", vec![])
            .with_entity("Audit", vec![])
            .with_entity("Contract Item", vec![]);
        let mut audit = MandatoryMapping::new("Audit", "Contract");
        audit.filters.push(RecordFilter {
            field: "kind".into(),
            value: serde_json::json!("contract"),
        });
        let later = MandatoryMapping::new("Audit", "Other");

        let store = collect_records(&source, &catalogue, &[audit, later], &mut Vec::<String>::new()).unwrap();

        assert_eq!(store.get("Contract").len(), 2);
        assert_eq!(store.get("Audit").len(), 1);
        assert_eq!(store.get("Audit")[0].name.as_deref(), Some("A1"));
        assert!(store.contains("Contract Item"));
        assert!(store.get("Contract Item").is_empty());
    }

    #[test]
    fn unavailable_metadata_propagates() {
        let mut source = fake();
        source.fields.remove("Note");
        let err = assemble_catalogue(&source, &CatalogueOptions::default(), &mut Vec::<String>::new())
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
