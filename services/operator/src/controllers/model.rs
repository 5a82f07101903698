use std::sync::Arc;

use async_trait::async_trait;
use lfo_langfuse::LangfuseApi;
use lfo_reconcile::{Controller, Lifecycle, ObjectKey, Readiness, ReconcileError};
use tracing::{info, warn};

use super::{fetch, lifecycle, mark_available, Context};
use crate::resources::{Model, ModelSpec};
use crate::store::Records;

/// Parse a decimal price string.
///
/// Missing, unparsable and non-finite values become `0.0` so a bad price
/// never blocks the model from being created.
pub fn parse_price(field: &str, value: Option<&str>) -> f64 {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0.0;
    };

    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        Ok(_) => {
            warn!(field, value = raw, "Price is not finite, using 0");
            0.0
        }
        Err(e) => {
            warn!(field, value = raw, error = %e, "Unparsable price, using 0");
            0.0
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Registers model pricing definitions. Not scoped to a project.
pub struct ModelController {
    models: Records<ModelSpec>,
    langfuse: Arc<dyn LangfuseApi>,
}

impl ModelController {
    pub fn new(ctx: &Context) -> Self {
        Self {
            models: ctx.records(),
            langfuse: Arc::clone(&ctx.langfuse),
        }
    }
}

/// Wire body for a model spec.
fn to_request(spec: &ModelSpec) -> lfo_langfuse::Model {
    lfo_langfuse::Model {
        id: None,
        model_name: spec.model_name.clone(),
        match_pattern: spec.match_pattern.clone(),
        start_date: non_empty(&spec.start_date),
        unit: spec.unit.clone(),
        input_price: parse_price("inputPrice", spec.input_price.as_deref()),
        output_price: parse_price("outputPrice", spec.output_price.as_deref()),
        total_price: parse_price("totalPrice", spec.total_price.as_deref()),
        tokenizer_id: non_empty(&spec.tokenizer_id),
        tokenizer_config: non_empty(&spec.tokenizer_config),
    }
}

#[async_trait]
impl Controller for ModelController {
    type Record = Model;
    type Parent = ();
    type Created = lfo_langfuse::Model;

    fn kind(&self) -> &'static str {
        "LangfuseModel"
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<Model>, ReconcileError> {
        fetch(&self.models, key).await
    }

    fn lifecycle(&self, model: &Model) -> Lifecycle {
        lifecycle(&model.status)
    }

    async fn resolve(
        &self,
        _key: &ObjectKey,
        _model: &Model,
    ) -> Result<Readiness<()>, ReconcileError> {
        Ok(Readiness::Ready(()))
    }

    async fn call_external(
        &self,
        model: &Model,
        _parent: &(),
    ) -> Result<lfo_langfuse::Model, ReconcileError> {
        info!(model_name = %model.spec.model_name, "Creating Langfuse model");

        self.langfuse
            .create_model(&to_request(&model.spec))
            .await
            .map_err(ReconcileError::adapter)
    }

    async fn commit(
        &self,
        key: &ObjectKey,
        _model: Model,
        _created: lfo_langfuse::Model,
    ) -> Result<(), ReconcileError> {
        mark_available(&self.models, key, "Model created successfully").await
    }
}

#[cfg(test)]
mod tests {
    use lfo_langfuse::{Call, MockLangfuse};
    use lfo_reconcile::{reconcile, Action};
    use rstest::rstest;

    use super::*;
    use crate::resources::Object;
    use crate::store::MemoryStore;

    fn spec() -> ModelSpec {
        ModelSpec {
            model_name: "gpt-x".to_string(),
            match_pattern: "(?i)^gpt-x$".to_string(),
            start_date: None,
            unit: "TOKENS".to_string(),
            input_price: Some("0.000002".to_string()),
            output_price: Some("not-a-number".to_string()),
            total_price: None,
            tokenizer_id: Some(String::new()),
            tokenizer_config: None,
        }
    }

    #[rstest]
    #[case::missing(None, 0.0)]
    #[case::empty(Some(""), 0.0)]
    #[case::decimal(Some("0.000002"), 0.000002)]
    #[case::padded(Some(" 1.5 "), 1.5)]
    #[case::integer(Some("3"), 3.0)]
    #[case::garbage(Some("abc"), 0.0)]
    #[case::comma_decimal(Some("1,5"), 0.0)]
    #[case::not_finite(Some("inf"), 0.0)]
    #[case::nan(Some("NaN"), 0.0)]
    fn test_parse_price(#[case] value: Option<&str>, #[case] expected: f64) {
        assert_eq!(parse_price("inputPrice", value), expected);
    }

    #[test]
    fn test_request_drops_empty_optionals() {
        let request = to_request(&spec());
        assert_eq!(request.input_price, 0.000002);
        assert_eq!(request.output_price, 0.0);
        assert_eq!(request.tokenizer_id, None);
        assert_eq!(request.id, None);
    }

    #[tokio::test]
    async fn test_bad_price_degrades_to_zero() {
        let store = Arc::new(MemoryStore::new());
        let langfuse = Arc::new(MockLangfuse::new());
        let ctx = Context::new(store, langfuse.clone());
        let controller = ModelController::new(&ctx);

        let key = ObjectKey::new("default", "gpt-x");
        ctx.records::<ModelSpec>()
            .create(&Object::new(&key, spec()))
            .await
            .unwrap();

        assert_eq!(reconcile(&controller, &key).await.unwrap(), Action::Done);

        let calls = langfuse.calls();
        assert_eq!(calls.len(), 1);
        let Call::CreateModel(sent) = &calls[0] else {
            panic!("unexpected call: {:?}", calls[0]);
        };
        assert_eq!(sent.output_price, 0.0);
        assert_eq!(sent.input_price, 0.000002);

        let model = controller.fetch(&key).await.unwrap().unwrap();
        assert_eq!(model.status.conditions[0].message, "Model created successfully");

        // Second pass is a no-op.
        reconcile(&controller, &key).await.unwrap();
        assert_eq!(langfuse.call_count(), 1);
    }
}
