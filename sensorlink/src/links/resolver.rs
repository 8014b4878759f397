use crate::links::pattern::LinkPattern;
use crate::model::url::self_link;
use crate::model::PropertyBag;
use crate::settings::ExperimentalSettings;
use serde_json::{Map, Value};

/// Adds and removes navigation links derived from `<local>.<Type>@iot.id` reference keys
/// inside property documents.
#[derive(Debug, Clone)]
pub struct CustomLinks {
    pattern: LinkPattern,
    enabled: bool,
    recurse_depth: u32,
}

impl CustomLinks {
    pub fn new(pattern: LinkPattern, enabled: bool, recurse_depth: u32) -> Self {
        CustomLinks { pattern, enabled, recurse_depth }
    }

    pub fn from_settings(settings: &ExperimentalSettings) -> Self {
        CustomLinks::new(LinkPattern::default(), settings.custom_links_enable, settings.custom_links_recurse_depth)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn pattern(&self) -> &LinkPattern {
        &self.pattern
    }

    /// Expands the entity's property bag before it is sent out. Does nothing when custom links are off.
    pub fn expand_entity<E: PropertyBag + ?Sized>(&self, entity: &mut E, service_root: &str) {
        if !self.enabled {
            return;
        }
        if let Some(properties) = entity.property_bag_mut() {
            self.expand(properties, service_root, self.recurse_depth);
        }
    }

    /// Strips derived links from the entity's property bag before it is stored.
    pub fn clean_entity<E: PropertyBag + ?Sized>(&self, entity: &mut E) {
        if !self.enabled {
            return;
        }
        if let Some(properties) = entity.property_bag_mut() {
            self.contract(properties, self.recurse_depth);
        }
    }

    /// Adds `<local>.<Type>@iot.navigationLink` next to every scalar reference key.
    /// Nested objects are visited while `depth > 0`; arrays are never entered. Existing keys win.
    pub fn expand(&self, properties: &mut Map<String, Value>, service_root: &str, depth: u32) {
        let staged = self.stage_links(properties, service_root, depth);
        for (key, link) in staged {
            properties.entry(key).or_insert(link);
        }
    }

    fn stage_links(&self, level: &mut Map<String, Value>, service_root: &str, depth: u32) -> Vec<(String, Value)> {
        let mut staged = Vec::new();
        for (key, value) in level.iter_mut() {
            match value {
                Value::Object(nested) => {
                    if depth > 0 {
                        self.expand(nested, service_root, depth - 1);
                    }
                }
                scalar => {
                    if let Some(token) = self.pattern.token(key, scalar) {
                        let link = self_link(service_root, token.entity_type, &token.id);
                        staged.push((token.navigation_link_key(), Value::String(link)));
                    }
                }
            }
        }
        staged
    }

    /// Removes `<local>.<Type>@iot.navigationLink` and `<local>.<Type>` for every scalar reference key.
    /// The reference key itself stays.
    pub fn contract(&self, properties: &mut Map<String, Value>, depth: u32) {
        let staged = self.stage_removals(properties, depth);
        for key in staged {
            properties.shift_remove(&key);
        }
    }

    fn stage_removals(&self, level: &mut Map<String, Value>, depth: u32) -> Vec<String> {
        let mut staged = Vec::new();
        for (key, value) in level.iter_mut() {
            match value {
                Value::Object(nested) => {
                    if depth > 0 {
                        self.contract(nested, depth - 1);
                    }
                }
                scalar => {
                    if let Some(token) = self.pattern.token(key, scalar) {
                        staged.push(token.item_key());
                        staged.push(token.navigation_link_key());
                    }
                }
            }
        }
        staged
    }
}
