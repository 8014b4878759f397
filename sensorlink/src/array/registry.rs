use crate::error::AppError;
use crate::model::{EntityRef, EntityType, IdManager, LongIdManager, Observation, TimeFormat, TimeInstant, TimeInterval, TimeValue};
use crate::trace;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const AT_IOT_ID: &str = "@iot.id";

/// Describes how a single dataArray component writes into and reads from an observation.
pub struct ComponentSpec {
    pub name: &'static str,
    pub set: fn(&dyn IdManager, &Value, &mut Observation) -> Result<(), AppError>,
    pub get: fn(&Observation) -> Value,
}

/// Immutable component table, built once and shared by reference.
pub struct Registry {
    ids: Arc<dyn IdManager>,
    components: HashMap<&'static str, ComponentSpec>,
}

/// A resolved component bound to the registry's id parser.
#[derive(Clone, Copy)]
pub struct Handler<'a> {
    spec: &'a ComponentSpec,
    ids: &'a dyn IdManager,
}

impl<'a> Handler<'a> {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn handle(&self, value: &Value, target: &mut Observation) -> Result<(), AppError> {
        (self.spec.set)(self.ids, value, target)
    }

    pub fn extract(&self, source: &Observation) -> Value {
        (self.spec.get)(source)
    }
}

static SHARED: Lazy<Registry> = Lazy::new(|| Registry::new(Arc::new(LongIdManager)));

impl Registry {
    pub fn new(ids: Arc<dyn IdManager>) -> Self {
        let specs = vec![
            ComponentSpec { name: "id", set: set_id, get: get_id },
            ComponentSpec { name: AT_IOT_ID, set: set_id, get: get_id },
            ComponentSpec {
                name: "result",
                set: |_, value, target| {
                    target.result = Some(value.clone());
                    Ok(())
                },
                get: |source| source.result.clone().unwrap_or(Value::Null),
            },
            ComponentSpec {
                name: "resultQuality",
                set: |_, value, target| {
                    target.result_quality = Some(value.clone());
                    Ok(())
                },
                get: |source| source.result_quality.clone().unwrap_or(Value::Null),
            },
            ComponentSpec {
                name: "parameters",
                set: |_, value, target| match value {
                    Value::Object(map) => {
                        target.parameters = Some(map.clone());
                        Ok(())
                    }
                    _ => Err(AppError::invalid_argument("parameters", "has to be an object")),
                },
                get: |source| source.parameters.clone().map(Value::Object).unwrap_or(Value::Null),
            },
            ComponentSpec {
                name: "phenomenonTime",
                set: |_, value, target| {
                    let time = parse_time("phenomenonTime", value, &[TimeFormat::Instant, TimeFormat::Interval])?;
                    target.phenomenon_time = Some(time);
                    Ok(())
                },
                get: |source| display_or_null(source.phenomenon_time.as_ref()),
            },
            ComponentSpec {
                name: "resultTime",
                set: |_, value, target| {
                    let text = time_text("resultTime", TimeFormat::Instant.describe(), value)?;
                    let time = TimeInstant::parse(text)
                        .map_err(|reason| time_error("resultTime", TimeFormat::Instant.describe(), value, &reason))?;
                    target.result_time = Some(time);
                    Ok(())
                },
                get: |source| display_or_null(source.result_time.as_ref()),
            },
            ComponentSpec {
                name: "validTime",
                set: |_, value, target| {
                    let text = time_text("validTime", TimeFormat::Interval.describe(), value)?;
                    let time = TimeInterval::parse(text)
                        .map_err(|reason| time_error("validTime", TimeFormat::Interval.describe(), value, &reason))?;
                    target.valid_time = Some(time);
                    Ok(())
                },
                get: |source| display_or_null(source.valid_time.as_ref()),
            },
            ComponentSpec {
                name: "FeatureOfInterest/id",
                set: |ids, value, target| {
                    let id = ids.parse_json_id(value)?;
                    target.feature_of_interest = Some(EntityRef::new(EntityType::FeatureOfInterest, id));
                    Ok(())
                },
                get: |source| source.feature_of_interest.as_ref().map(|r| r.id.to_json()).unwrap_or(Value::Null),
            },
        ];
        let components = specs.into_iter().map(|spec| (spec.name, spec)).collect();
        Registry { ids, components }
    }

    /// Process-wide registry over long ids, built on first access.
    pub fn shared() -> &'static Registry {
        &SHARED
    }

    pub fn resolve(&self, component: &str) -> Option<Handler<'_>> {
        self.components.get(component).map(|spec| Handler { spec, ids: self.ids.as_ref() })
    }

    pub fn id_manager(&self) -> &dyn IdManager {
        self.ids.as_ref()
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.components.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn set_id(ids: &dyn IdManager, value: &Value, target: &mut Observation) -> Result<(), AppError> {
    target.id = Some(ids.parse_json_id(value)?);
    Ok(())
}

fn get_id(source: &Observation) -> Value {
    source.id.as_ref().map(|id| id.to_json()).unwrap_or(Value::Null)
}

fn display_or_null<T: ToString>(value: Option<&T>) -> Value {
    value.map(|v| Value::String(v.to_string())).unwrap_or(Value::Null)
}

fn time_error(component: &str, expected: &str, value: &Value, reason: &str) -> AppError {
    trace!("{}: {} is not a {} ({})", component, value, expected, reason);
    AppError::TimeParse { component: component.to_string(), expected: expected.to_string(), value: value.to_string() }
}

fn time_text<'v>(component: &str, expected: &str, value: &'v Value) -> Result<&'v str, AppError> {
    value.as_str().ok_or_else(|| time_error(component, expected, value, "not a string"))
}

fn parse_time(component: &str, value: &Value, formats: &[TimeFormat]) -> Result<TimeValue, AppError> {
    let expected = formats.iter().map(|f| f.describe()).collect::<Vec<_>>().join(" or ");
    let text = time_text(component, &expected, value)?;
    TimeValue::parse_first(text, formats).map_err(|attempts| {
        for attempt in &attempts {
            trace!("Not a {}: {} ({})", attempt.format.describe(), text, attempt.reason);
        }
        AppError::TimeParse { component: component.to_string(), expected, value: value.to_string() }
    })
}
