//! Option Resolver
//!
//! Owns the cascading option lists (years → makes → models), their loading
//! state, and the staleness rules that keep a late response from
//! overwriting a list that has already moved on.
//!
//! A fetch is split in two halves so the runtime can keep the controller
//! responsive while the request is in flight: [`OptionResolver::begin`]
//! invalidates the list and hands out a [`FetchTicket`]; the ticket is run
//! against a [`CatalogService`] elsewhere, and the result comes back through
//! [`OptionResolver::complete`], which applies it only if the ticket is
//! still current.

use crate::catalog::CatalogService;
use crate::error::CatalogResult;
use crate::wizard::form::Field;

/// Which dependent list a fetch targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionList {
    Years,
    Makes,
    Models,
}

impl OptionList {
    /// Non-selectable first entry of the populated list
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Years => "Select Years",
            Self::Makes => "Select Makes",
            Self::Models => "Select Models",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Years => 0,
            Self::Makes => 1,
            Self::Models => 2,
        }
    }
}

impl std::fmt::Display for OptionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Years => "years",
            Self::Makes => "makes",
            Self::Models => "models",
        };
        f.write_str(name)
    }
}

impl OptionList {
    /// The list a field selects from, if any
    pub fn for_field(field: Field) -> Option<Self> {
        match field {
            Field::Year => Some(Self::Years),
            Field::Make => Some(Self::Makes),
            Field::Model => Some(Self::Models),
            _ => None,
        }
    }
}

/// One issued fetch, tagged with the inputs and generation it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub list: OptionList,
    pub generation: u64,
    pub year: String,
    pub make: String,
}

impl FetchTicket {
    /// Perform the catalog call this ticket describes
    pub async fn run(&self, catalog: &dyn CatalogService) -> CatalogResult<Vec<String>> {
        match self.list {
            OptionList::Years => catalog.list_years().await,
            OptionList::Makes => catalog.list_makes(&self.year).await,
            OptionList::Models => catalog.list_models(&self.year, &self.make).await,
        }
    }
}

/// The three option lists as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    pub years: Vec<String>,
    pub makes: Vec<String>,
    pub models: Vec<String>,
}

impl OptionSet {
    pub fn get(&self, list: OptionList) -> &[String] {
        match list {
            OptionList::Years => &self.years,
            OptionList::Makes => &self.makes,
            OptionList::Models => &self.models,
        }
    }

    fn get_mut(&mut self, list: OptionList) -> &mut Vec<String> {
        match list {
            OptionList::Years => &mut self.years,
            OptionList::Makes => &mut self.makes,
            OptionList::Models => &mut self.models,
        }
    }
}

#[derive(Debug, Default)]
pub struct OptionResolver {
    options: OptionSet,
    generations: [u64; 3],
    in_flight: usize,
}

impl OptionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// True while any catalog fetch is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Invalidate `list` and issue a fetch for it.
    ///
    /// The list is cleared and its generation bumped in every case, so any
    /// response still in flight for it becomes stale. Returns `None` when a
    /// required input is empty: no request is issued and the list stays empty.
    pub fn begin(&mut self, list: OptionList, year: &str, make: &str) -> Option<FetchTicket> {
        let idx = list.index();
        self.generations[idx] += 1;
        self.options.get_mut(list).clear();

        let inputs_ready = match list {
            OptionList::Years => true,
            OptionList::Makes => !year.is_empty(),
            OptionList::Models => !year.is_empty() && !make.is_empty(),
        };
        if !inputs_ready {
            tracing::debug!("Skipping {} fetch: parent selection is empty", list);
            return None;
        }

        self.in_flight += 1;
        Some(FetchTicket {
            list,
            generation: self.generations[idx],
            year: year.to_string(),
            make: make.to_string(),
        })
    }

    /// Settle a fetch issued by [`begin`](Self::begin).
    ///
    /// `year`/`make` are the form's values at completion time. The result is
    /// applied only if no newer fetch for the same list has been issued and
    /// the ticket's inputs still match. Failures leave the list empty and are
    /// only logged. Returns whether the list was updated.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: CatalogResult<Vec<String>>,
        year: &str,
        make: &str,
    ) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        let current = self.generations[ticket.list.index()] == ticket.generation
            && match ticket.list {
                OptionList::Years => true,
                OptionList::Makes => ticket.year == year,
                OptionList::Models => ticket.year == year && ticket.make == make,
            };

        if !current {
            tracing::debug!(
                "Discarding stale {} response (generation {}, year={:?}, make={:?})",
                ticket.list,
                ticket.generation,
                ticket.year,
                ticket.make
            );
            return false;
        }

        match result {
            Ok(values) => {
                let list = self.options.get_mut(ticket.list);
                list.clear();
                list.reserve(values.len() + 1);
                list.push(ticket.list.placeholder().to_string());
                list.extend(values);
                tracing::debug!("Loaded {} {}", list.len() - 1, ticket.list);
                true
            }
            Err(e) => {
                tracing::warn!("Error fetching '{}' data: {}", ticket.list, e);
                false
            }
        }
    }

    /// Fetch and store the years list
    pub async fn list_years(&mut self, catalog: &dyn CatalogService) -> bool {
        self.resolve(catalog, OptionList::Years, "", "").await
    }

    /// Fetch and store the makes for `year`
    pub async fn list_makes(&mut self, catalog: &dyn CatalogService, year: &str) -> bool {
        self.resolve(catalog, OptionList::Makes, year, "").await
    }

    /// Fetch and store the models for `year` + `make`
    pub async fn list_models(
        &mut self,
        catalog: &dyn CatalogService,
        year: &str,
        make: &str,
    ) -> bool {
        self.resolve(catalog, OptionList::Models, year, make).await
    }

    async fn resolve(
        &mut self,
        catalog: &dyn CatalogService,
        list: OptionList,
        year: &str,
        make: &str,
    ) -> bool {
        let Some(ticket) = self.begin(list, year, make) else {
            return false;
        };
        let result = ticket.run(catalog).await;
        self.complete(&ticket, result, year, make)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use async_trait::async_trait;

    struct StaticCatalog;

    #[async_trait]
    impl CatalogService for StaticCatalog {
        async fn list_years(&self) -> CatalogResult<Vec<String>> {
            Ok(vec!["2021".to_string(), "2020".to_string()])
        }

        async fn list_makes(&self, year: &str) -> CatalogResult<Vec<String>> {
            Ok(vec![format!("Make-{}", year)])
        }

        async fn list_models(&self, _year: &str, make: &str) -> CatalogResult<Vec<String>> {
            if make == "Broken" {
                return Err(CatalogError::Malformed("boom".to_string()));
            }
            Ok(vec![format!("{}-Model", make)])
        }
    }

    fn ok(values: &[&str]) -> CatalogResult<Vec<String>> {
        Ok(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(OptionList::Years.placeholder(), "Select Years");
        assert_eq!(OptionList::Makes.placeholder(), "Select Makes");
        assert_eq!(OptionList::Models.placeholder(), "Select Models");
        assert_eq!(OptionList::for_field(Field::Model), Some(OptionList::Models));
        assert_eq!(OptionList::for_field(Field::Name), None);
    }

    #[test]
    fn test_empty_parent_issues_no_fetch() {
        let mut resolver = OptionResolver::new();
        assert!(resolver.begin(OptionList::Makes, "", "").is_none());
        assert!(resolver.begin(OptionList::Models, "2020", "").is_none());
        assert!(resolver.begin(OptionList::Models, "", "Honda").is_none());
        assert!(!resolver.is_busy());
        assert!(resolver.options().makes.is_empty());
    }

    #[test]
    fn test_success_prefixes_placeholder() {
        let mut resolver = OptionResolver::new();
        let ticket = resolver.begin(OptionList::Makes, "2020", "").unwrap();
        assert!(resolver.is_busy());

        assert!(resolver.complete(&ticket, ok(&["Acura", "Honda"]), "2020", ""));
        assert!(!resolver.is_busy());
        assert_eq!(resolver.options().makes, vec!["Select Makes", "Acura", "Honda"]);
    }

    #[test]
    fn test_failure_leaves_list_empty_and_clears_busy() {
        let mut resolver = OptionResolver::new();
        let ticket = resolver.begin(OptionList::Years, "", "").unwrap();
        let applied = resolver.complete(
            &ticket,
            Err(CatalogError::Malformed("bad".to_string())),
            "",
            "",
        );
        assert!(!applied);
        assert!(!resolver.is_busy());
        assert!(resolver.options().years.is_empty());
    }

    #[test]
    fn test_refetch_clears_previous_contents() {
        let mut resolver = OptionResolver::new();
        let first = resolver.begin(OptionList::Makes, "2020", "").unwrap();
        resolver.complete(&first, ok(&["Acura"]), "2020", "");
        assert_eq!(resolver.options().makes.len(), 2);

        let _second = resolver.begin(OptionList::Makes, "2021", "").unwrap();
        assert!(resolver.options().makes.is_empty());
    }

    #[test]
    fn test_out_of_order_completion_discards_stale() {
        let mut resolver = OptionResolver::new();
        let first = resolver.begin(OptionList::Makes, "2019", "").unwrap();
        let second = resolver.begin(OptionList::Makes, "2020", "").unwrap();
        assert_eq!(resolver.in_flight(), 2);

        // Newer response lands first
        assert!(resolver.complete(&second, ok(&["Tesla"]), "2020", ""));
        // Older response arrives late and must not overwrite
        assert!(!resolver.complete(&first, ok(&["Saturn"]), "2020", ""));

        assert_eq!(resolver.options().makes, vec!["Select Makes", "Tesla"]);
        assert!(!resolver.is_busy());
    }

    #[test]
    fn test_stale_first_response_before_second() {
        let mut resolver = OptionResolver::new();
        let first = resolver.begin(OptionList::Makes, "2019", "").unwrap();
        let second = resolver.begin(OptionList::Makes, "2020", "").unwrap();

        assert!(!resolver.complete(&first, ok(&["Saturn"]), "2020", ""));
        assert!(resolver.options().makes.is_empty());
        assert!(resolver.is_busy());

        assert!(resolver.complete(&second, ok(&["Tesla"]), "2020", ""));
        assert!(!resolver.is_busy());
    }

    #[test]
    fn test_models_ignored_when_make_changed() {
        let mut resolver = OptionResolver::new();
        let ticket = resolver.begin(OptionList::Models, "2020", "Honda").unwrap();
        // Form moved on to another make without a new models fetch recorded yet
        assert!(!resolver.complete(&ticket, ok(&["Civic"]), "2020", "Toyota"));
        assert!(resolver.options().models.is_empty());
    }

    #[test]
    fn test_clearing_parent_invalidates_in_flight() {
        let mut resolver = OptionResolver::new();
        let ticket = resolver.begin(OptionList::Makes, "2020", "").unwrap();
        assert!(resolver.begin(OptionList::Makes, "", "").is_none());

        assert!(!resolver.complete(&ticket, ok(&["Acura"]), "2020", ""));
        assert!(resolver.options().makes.is_empty());
        assert!(!resolver.is_busy());
    }

    #[tokio::test]
    async fn test_inline_operations() {
        let mut resolver = OptionResolver::new();
        assert!(resolver.list_years(&StaticCatalog).await);
        assert!(resolver.list_makes(&StaticCatalog, "2021").await);
        assert!(resolver.list_models(&StaticCatalog, "2021", "Honda").await);

        let options = resolver.options();
        assert_eq!(options.years, vec!["Select Years", "2021", "2020"]);
        assert_eq!(options.makes, vec!["Select Makes", "Make-2021"]);
        assert_eq!(options.models, vec!["Select Models", "Honda-Model"]);
        assert!(!resolver.is_busy());
    }

    #[tokio::test]
    async fn test_inline_failure_and_empty_input() {
        let mut resolver = OptionResolver::new();
        assert!(!resolver.list_models(&StaticCatalog, "2021", "Broken").await);
        assert!(!resolver.list_makes(&StaticCatalog, "").await);
        assert!(resolver.options().models.is_empty());
        assert!(!resolver.is_busy());
    }
}
