//! `unused-component`: schemas declared but never reached.

use super::{Rule, Violation};
use crate::error::RuleError;
use crate::models::openapi::OpenApiDocument;
use crate::models::Severity;

pub struct UnusedComponent;

impl Rule for UnusedComponent {
    fn id(&self) -> &'static str {
        "unused-component"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "component schema not referenced, directly or transitively, by any operation"
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        let used = doc.used_components();
        Ok(doc
            .components
            .iter()
            .filter(|c| !used.contains(&c.name))
            .map(|c| {
                Violation::new(
                    c.pointer.clone(),
                    format!("component schema \"{}\" is not referenced by any operation", c.name),
                    c.span,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::doc;

    #[test]
    fn test_transitive_use_counts_and_orphans_flagged() {
        let d = doc(
            r##"
openapi: 3.0.0
paths:
  /items:
    get:
      operationId: listItems
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/ItemList" }
components:
  schemas:
    ItemList:
      type: array
      items: { $ref: "#/components/schemas/Item" }
    Item:
      type: object
    Orphan:
      type: object
      properties:
        item: { $ref: "#/components/schemas/Item" }
"##,
        );
        let v = UnusedComponent.check(&d).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location, "#/components/schemas/Orphan");
    }
}
