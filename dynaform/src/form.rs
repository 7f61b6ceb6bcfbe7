//! The form: config, registries, stores and collaborators wired together.

use crate::action::Action;
use crate::config::{FieldConfig, FormConfig, RawFieldConfig};
use crate::context::FormContext;
use crate::error::{DynaformError, Result};
use crate::event::{ActionRecorder, ChangeSink};
use crate::item::{Item, ItemPayload};
use crate::lookup::{CatalogLookup, DivisionLookup, FileLookup, Lookups, UserLookup};
use crate::registry::{FieldType, FieldTypeRegistry};
use crate::rules::{EditRule, Required, Unique, ValidRule};
use crate::value::is_empty_value;
use chrono::FixedOffset;
use dynaform_store::{
    ActionQuery, ActionStore, FieldQuery, FieldStore, ItemId, MemoryStore, RecordStore, UserId,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Audit trail listings return at most this many actions.
pub const ACTIONS_PAGE_SIZE: usize = 10;

type FieldQueryHook = Arc<dyn Fn(&mut FieldQuery) + Send + Sync>;
type ActionQueryHook = Arc<dyn Fn(&mut ActionQuery) + Send + Sync>;

/// Listing parameters for [`Form::list_items`].
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Free-text search across all field values
    pub search: Option<String>,
    /// Per-field filter values, keyed by field name
    pub filter: serde_json::Map<String, Value>,
    /// Field name to order by, or the synthetic `created_at`
    pub order_by: Option<String>,
    pub ascending: bool,
    pub per_page: Option<usize>,
    /// Zero-based page, used only when `per_page` is set
    pub page: usize,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            search: None,
            filter: serde_json::Map::new(),
            order_by: None,
            ascending: true,
            per_page: None,
            page: 0,
        }
    }
}

/// A configured form: the entry point for everything item-shaped.
///
/// Built once per request scope via [`Form::builder`]; items borrow it for
/// every operation.
pub struct Form {
    config: FormConfig,
    registry: FieldTypeRegistry,
    valid_rules: IndexMap<String, Arc<dyn ValidRule>>,
    edit_rules: IndexMap<String, Arc<dyn EditRule>>,
    records: Arc<dyn RecordStore>,
    field_rows: Arc<dyn FieldStore>,
    actions: Arc<dyn ActionStore>,
    lookups: Lookups,
    sink: Arc<dyn ChangeSink>,
    context: FormContext,
    field_query_hook: Option<FieldQueryHook>,
    action_query_hook: Option<ActionQueryHook>,
}

impl Form {
    /// Start building a form from raw config entries
    pub fn builder(entries: Vec<RawFieldConfig>) -> FormBuilder {
        FormBuilder::new(entries)
    }

    /// Open an existing item
    pub fn load_item(&self, id: &ItemId) -> Result<Item> {
        let record = self.records.open(id)?;
        Item::from_record(self, record)
    }

    /// Fresh item with every field empty
    pub fn new_item(&self) -> Result<Item> {
        Item::empty(self)
    }

    /// Fresh item seeded from a payload
    pub fn item_from_payload(&self, payload: ItemPayload) -> Result<Item> {
        Item::from_payload(self, payload)
    }

    /// List items: search, per-field filters, ordering, pagination.
    /// Returns the page of items and the total match count.
    pub fn list_items(&self, params: &ListParams) -> Result<(Vec<Item>, usize)> {
        let mut query = self.records.query();
        if let Some(search) = params.search.as_deref() {
            if !search.trim().is_empty() {
                self.records.search(&mut query, search);
            }
        }
        for (name, value) in &params.filter {
            let Some(config) = self.config.get(name) else {
                debug!(field = %name, "filter on unconfigured field ignored");
                continue;
            };
            if !config.filterable || is_empty_value(value) {
                continue;
            }
            let kind = self.descriptor(config)?;
            kind.build_filter(&mut query, config, value, self);
        }
        match params.order_by.as_deref() {
            // creation time is record metadata, always orderable
            Some("created_at") => self
                .records
                .order_by(&mut query, "created_at", params.ascending),
            Some(name) => {
                let sortable = self.config.get(name).map(|c| c.sortable).unwrap_or(false);
                if sortable {
                    self.records.order_by(&mut query, name, params.ascending);
                } else {
                    debug!(field = %name, "order by unsortable field, falling back to id");
                    self.records.order_by(&mut query, "id", true);
                }
            }
            None => self.records.order_by(&mut query, "id", params.ascending),
        }
        if let Some(per_page) = params.per_page {
            query.paginate(per_page, params.page);
        }
        let (records, total) = self.records.fetch(&query)?;
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            items.push(Item::from_record(self, record)?);
        }
        Ok((items, total))
    }

    /// Most recent audit actions, newest first, capped at
    /// [`ACTIONS_PAGE_SIZE`]. Pass an item id to scope to one item.
    pub fn list_actions(&self, item: Option<&ItemId>) -> Result<Vec<Action>> {
        let mut query = ActionQuery::new(ACTIONS_PAGE_SIZE);
        if let Some(id) = item {
            query = query.for_item(id.clone());
        }
        if let Some(hook) = &self.action_query_hook {
            hook(&mut query);
        }
        let records = self.actions.list(&query)?;
        records
            .into_iter()
            .map(|record| Action::from_record(record, &self.lookups, &self.context))
            .collect()
    }

    /// The built, view-resolved field configuration
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn context(&self) -> &FormContext {
        &self.context
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn field_rows(&self) -> &dyn FieldStore {
        self.field_rows.as_ref()
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    pub(crate) fn sink(&self) -> &dyn ChangeSink {
        self.sink.as_ref()
    }

    /// Field type of a built config entry
    pub(crate) fn descriptor(&self, config: &FieldConfig) -> Result<Arc<dyn FieldType>> {
        self.registry
            .get(&config.descriptor)
            .ok_or_else(|| DynaformError::unknown_field_type(&config.descriptor))
    }

    pub(crate) fn valid_rule(&self, name: &str) -> Option<Arc<dyn ValidRule>> {
        self.valid_rules.get(name).cloned()
    }

    pub(crate) fn edit_rule(&self, name: &str) -> Option<Arc<dyn EditRule>> {
        self.edit_rules.get(name).cloned()
    }

    /// Let the owner narrow a uniqueness probe before it runs
    pub(crate) fn extend_field_query(&self, query: &mut FieldQuery) {
        if let Some(hook) = &self.field_query_hook {
            hook(query);
        }
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.config.fields().len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Form`]. Everything is optional: stores default to one
/// shared in-memory store and the sink to an action recorder on it.
pub struct FormBuilder {
    entries: Vec<RawFieldConfig>,
    view: Option<String>,
    registry: FieldTypeRegistry,
    valid_rules: IndexMap<String, Arc<dyn ValidRule>>,
    edit_rules: IndexMap<String, Arc<dyn EditRule>>,
    records: Option<Arc<dyn RecordStore>>,
    field_rows: Option<Arc<dyn FieldStore>>,
    actions: Option<Arc<dyn ActionStore>>,
    lookups: Lookups,
    sink: Option<Arc<dyn ChangeSink>>,
    context: FormContext,
    field_query_hook: Option<FieldQueryHook>,
    action_query_hook: Option<ActionQueryHook>,
}

impl FormBuilder {
    fn new(entries: Vec<RawFieldConfig>) -> Self {
        let mut valid_rules: IndexMap<String, Arc<dyn ValidRule>> = IndexMap::new();
        valid_rules.insert("required".to_string(), Arc::new(Required));
        valid_rules.insert("unique".to_string(), Arc::new(Unique));
        Self {
            entries,
            view: None,
            registry: FieldTypeRegistry::with_builtins(),
            valid_rules,
            edit_rules: IndexMap::new(),
            records: None,
            field_rows: None,
            actions: None,
            lookups: Lookups::default(),
            sink: None,
            context: FormContext::default(),
            field_query_hook: None,
            action_query_hook: None,
        }
    }

    /// Resolve config against a named view
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn records(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.records = Some(store);
        self
    }

    pub fn field_rows(mut self, store: Arc<dyn FieldStore>) -> Self {
        self.field_rows = Some(store);
        self
    }

    pub fn actions(mut self, store: Arc<dyn ActionStore>) -> Self {
        self.actions = Some(store);
        self
    }

    pub fn catalog(mut self, lookup: Arc<dyn CatalogLookup>) -> Self {
        self.lookups.catalog = lookup;
        self
    }

    pub fn divisions(mut self, lookup: Arc<dyn DivisionLookup>) -> Self {
        self.lookups.divisions = lookup;
        self
    }

    pub fn files(mut self, lookup: Arc<dyn FileLookup>) -> Self {
        self.lookups.files = lookup;
        self
    }

    pub fn users(mut self, lookup: Arc<dyn UserLookup>) -> Self {
        self.lookups.users = lookup;
        self
    }

    /// Replace the change sink (default records audit actions)
    pub fn sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The acting user, stamped onto created items and actions
    pub fn current_user(mut self, user_id: UserId) -> Self {
        self.context = self.context.with_user(user_id);
        self
    }

    /// Display timezone for datetimes
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.context = self.context.with_timezone(timezone);
        self
    }

    /// Register a custom field type under a key usable as `type` or
    /// `typeClass` in config
    pub fn field_type(mut self, key: impl Into<String>, kind: Arc<dyn FieldType>) -> Self {
        self.registry.register(key, kind);
        self
    }

    /// Register (or replace) a named validation rule
    pub fn valid_rule(mut self, name: impl Into<String>, rule: Arc<dyn ValidRule>) -> Self {
        self.valid_rules.insert(name.into(), rule);
        self
    }

    /// Register a named edit rule
    pub fn edit_rule(mut self, name: impl Into<String>, rule: Arc<dyn EditRule>) -> Self {
        self.edit_rules.insert(name.into(), rule);
        self
    }

    /// Narrow uniqueness probes (e.g. to the owner's items)
    pub fn field_query(mut self, hook: impl Fn(&mut FieldQuery) + Send + Sync + 'static) -> Self {
        self.field_query_hook = Some(Arc::new(hook));
        self
    }

    /// Adjust audit listings (e.g. restrict to certain users)
    pub fn action_query(mut self, hook: impl Fn(&mut ActionQuery) + Send + Sync + 'static) -> Self {
        self.action_query_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<Form> {
        let fallback = Arc::new(MemoryStore::new());
        let records = self.records.unwrap_or_else(|| fallback.clone());
        let field_rows: Arc<dyn FieldStore> = self.field_rows.unwrap_or_else(|| fallback.clone());
        let actions: Arc<dyn ActionStore> = self.actions.unwrap_or_else(|| fallback.clone());
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(ActionRecorder::new(actions.clone())));
        let config = FormConfig::build(
            self.entries,
            self.view.as_deref(),
            &self.registry,
            &self.lookups,
        )?;
        debug!(
            fields = config.fields().len(),
            view = self.view.as_deref().unwrap_or("-"),
            "form built"
        );
        Ok(Form {
            config,
            registry: self.registry,
            valid_rules: self.valid_rules,
            edit_rules: self.edit_rules,
            records,
            field_rows,
            actions,
            lookups: self.lookups,
            sink,
            context: self.context,
            field_query_hook: self.field_query_hook,
            action_query_hook: self.action_query_hook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Vec<RawFieldConfig> {
        serde_json::from_value(json!([
            { "name": "title", "title": "Title", "type": "text" },
            { "name": "notes", "title": "Notes", "type": "textarea" },
        ]))
        .unwrap()
    }

    fn seed(form: &Form, title: &str, notes: &str) -> ItemId {
        let mut item = form
            .item_from_payload(
                serde_json::from_value(json!({
                    "fields": [
                        { "name": "title", "value": title },
                        { "name": "notes", "value": notes },
                    ]
                }))
                .unwrap(),
            )
            .unwrap();
        assert!(item.save(form).unwrap());
        item.id().unwrap().clone()
    }

    #[test]
    fn list_filters_by_field_substring() {
        let form = Form::builder(entries()).build().unwrap();
        seed(&form, "Alpha", "x");
        seed(&form, "Beta", "y");

        let mut params = ListParams::default();
        params.filter.insert("title".to_string(), json!("alp"));
        let (items, total) = form.list_items(&params).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].field("title").unwrap().data(), &json!("Alpha"));
    }

    #[test]
    fn list_searches_all_fields() {
        let form = Form::builder(entries()).build().unwrap();
        seed(&form, "Alpha", "needle here");
        seed(&form, "Beta", "nothing");

        let params = ListParams {
            search: Some("NEEDLE".to_string()),
            ..Default::default()
        };
        let (items, total) = form.list_items(&params).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].field("title").unwrap().data(), &json!("Alpha"));
    }

    #[test]
    fn list_paginates_with_total() {
        let form = Form::builder(entries()).build().unwrap();
        for i in 0..5 {
            seed(&form, &format!("t{i}"), "");
        }
        let params = ListParams {
            order_by: Some("title".to_string()),
            per_page: Some(2),
            page: 1,
            ..Default::default()
        };
        let (items, total) = form.list_items(&params).unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].field("title").unwrap().data(), &json!("t2"));
    }

    #[test]
    fn order_by_unconfigured_field_falls_back() {
        let form = Form::builder(entries()).build().unwrap();
        seed(&form, "b", "");
        seed(&form, "a", "");
        let params = ListParams {
            order_by: Some("ghost".to_string()),
            ascending: false,
            ..Default::default()
        };
        // falls back to insertion (id) order, ascending
        let (items, _) = form.list_items(&params).unwrap();
        assert_eq!(items[0].field("title").unwrap().data(), &json!("b"));
    }

    #[test]
    fn custom_valid_rule_applies() {
        struct NoFoo;
        impl ValidRule for NoFoo {
            fn handle(
                &self,
                _scope: &crate::rules::RuleScope<'_>,
                field: &crate::field::Field,
            ) -> Result<Vec<String>> {
                if field.data() == &json!("foo") {
                    Ok(vec!["foo is reserved".to_string()])
                } else {
                    Ok(Vec::new())
                }
            }
        }

        let entries = serde_json::from_value(json!([
            { "name": "title", "title": "Title", "type": "text", "validRules": ["noFoo"] },
        ]))
        .unwrap();
        let form = Form::builder(entries)
            .valid_rule("noFoo", Arc::new(NoFoo))
            .build()
            .unwrap();
        let mut item = form
            .item_from_payload(
                serde_json::from_value(json!({
                    "fields": [{ "name": "title", "value": "foo" }]
                }))
                .unwrap(),
            )
            .unwrap();
        assert!(!item.save(&form).unwrap());
        assert_eq!(item.errors()[0].errors, ["foo is reserved"]);
    }
}
