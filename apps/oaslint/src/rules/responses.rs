//! `missing-response-schema`: success responses that describe no body.

use super::{Rule, Violation};
use crate::error::RuleError;
use crate::models::openapi::OpenApiDocument;
use crate::models::Severity;

pub struct MissingResponseSchema;

impl Rule for MissingResponseSchema {
    fn id(&self) -> &'static str {
        "missing-response-schema"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn description(&self) -> &'static str {
        "2xx response without a schema (204 No Content excepted)"
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        let mut out = Vec::new();
        for (path, op) in doc.operations() {
            for resp in &op.responses {
                if !resp.is_success() || resp.status == "204" || resp.has_schema() {
                    continue;
                }
                out.push(Violation::new(
                    path.label(op),
                    format!("success response {} has no schema", resp.status),
                    resp.span,
                ));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::doc;

    #[test]
    fn test_flags_empty_success_response() {
        let d = doc(
            r#"
openapi: 3.0.0
paths:
  /items:
    get:
      operationId: listItems
      responses:
        "200": { description: ok }
        "201":
          description: created
          content:
            application/json: {}
        "204": { description: gone }
        "400": { description: bad }
"#,
        );
        let v = MissingResponseSchema.check(&d).unwrap();
        let statuses: Vec<_> = v.iter().map(|x| x.message.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                "success response 200 has no schema".to_string(),
                "success response 201 has no schema".to_string()
            ]
        );
        assert_eq!(v[0].location, "GET /items");
        assert_eq!(v[0].span.line, 8);
    }

    #[test]
    fn test_schema_via_ref_counts() {
        let d = doc(
            r##"
openapi: 3.0.0
paths:
  /items:
    get:
      responses:
        2XX:
          $ref: "#/components/responses/Items"
components:
  responses:
    Items:
      description: ok
      content:
        application/json:
          schema: { type: array, items: { type: string } }
"##,
        );
        assert!(MissingResponseSchema.check(&d).unwrap().is_empty());
    }
}
