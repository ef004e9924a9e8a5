//! Startup-time registry of handler units.
//!
//! Units are registered by name and resolved from `<unit>::<entry-point>`
//! references. Nothing is looked up by runtime reflection: each unit lists
//! its entry points in an [`EntryTable`], and every entry point takes the
//! harness call convention `(input, context)`. The input type's shape is
//! introspected when the entry point is registered.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;

use crate::context::MockContext;
use crate::error::{HandlerError, HarnessError, RegistrationError};
use crate::reference::{HandlerReference, REFERENCE_DELIMITER};
use crate::shape::{DecodedInput, InputShape};

pub(crate) type BoundCall =
    Box<dyn FnOnce(MockContext) -> LocalBoxFuture<'static, Result<String, HandlerError>>>;

type UnitBinder<U> = Rc<dyn Fn(Arc<U>, DecodedInput) -> Result<BoundCall, HarnessError>>;
type Binder = Box<dyn Fn(DecodedInput) -> Result<BoundCall, HarnessError>>;

/// A unit of handler code with a no-argument construction path.
pub trait HandlerUnit: Sized + 'static {
    fn construct() -> Result<Self, HandlerError>;

    fn entry_points(table: &mut EntryTable<Self>);
}

struct TypedEntry<U> {
    input: Result<InputShape, String>,
    binder: UnitBinder<U>,
}

pub struct EntryTable<U> {
    entries: BTreeMap<String, TypedEntry<U>>,
    duplicates: Vec<String>,
}

impl<U: 'static> EntryTable<U> {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Registers a synchronous entry point.
    pub fn handler<I, O, E, F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        I: DeserializeOwned + 'static,
        O: Display + 'static,
        E: Into<HandlerError> + 'static,
        F: Fn(&U, I, &MockContext) -> Result<O, E> + 'static,
    {
        let handler = Rc::new(handler);
        let binder: UnitBinder<U> = Rc::new(move |unit: Arc<U>, decoded: DecodedInput| {
            let input: I = decoded.bind()?;
            let handler = Rc::clone(&handler);
            let call: BoundCall = Box::new(move |context: MockContext| {
                async move {
                    handler(unit.as_ref(), input, &context)
                        .map(|output| output.to_string())
                        .map_err(Into::into)
                }
                .boxed_local()
            });
            Ok(call)
        });
        self.insert::<I>(name, binder)
    }

    /// Registers an asynchronous entry point. The future runs to completion
    /// on a single-threaded runtime owned by the invocation.
    pub fn handler_async<I, O, E, F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        I: DeserializeOwned + 'static,
        O: Display + 'static,
        E: Into<HandlerError> + 'static,
        F: Fn(Arc<U>, I, MockContext) -> Fut + 'static,
        Fut: Future<Output = Result<O, E>> + 'static,
    {
        let handler = Rc::new(handler);
        let binder: UnitBinder<U> = Rc::new(move |unit: Arc<U>, decoded: DecodedInput| {
            let input: I = decoded.bind()?;
            let handler = Rc::clone(&handler);
            let call: BoundCall = Box::new(move |context: MockContext| {
                async move {
                    handler(unit, input, context)
                        .await
                        .map(|output| output.to_string())
                        .map_err(Into::into)
                }
                .boxed_local()
            });
            Ok(call)
        });
        self.insert::<I>(name, binder)
    }

    fn insert<I: DeserializeOwned>(&mut self, name: &str, binder: UnitBinder<U>) -> &mut Self {
        let entry = TypedEntry {
            input: InputShape::of::<I>(),
            binder,
        };
        if self.entries.insert(name.to_string(), entry).is_some() {
            self.duplicates.push(name.to_string());
        }
        self
    }
}

struct UnitEntry {
    resolve: fn(&HandlerReference) -> Result<ResolvedHandler, HarnessError>,
    entry_names: fn() -> Vec<String>,
}

#[derive(Default)]
pub struct Registry {
    units: BTreeMap<String, UnitEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<U: HandlerUnit>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<&mut Self, RegistrationError> {
        let name = name.into();
        if name.trim().is_empty() || name.contains(REFERENCE_DELIMITER) {
            return Err(RegistrationError::InvalidUnitName(name));
        }
        if self.units.contains_key(&name) {
            return Err(RegistrationError::DuplicateUnit(name));
        }

        let mut table = EntryTable::<U>::new();
        U::entry_points(&mut table);
        if let Some(entry_point) = table.duplicates.into_iter().next() {
            return Err(RegistrationError::DuplicateEntryPoint {
                unit: name,
                entry_point,
            });
        }

        self.units.insert(
            name,
            UnitEntry {
                resolve: resolve_unit::<U>,
                entry_names: entry_names::<U>,
            },
        );
        Ok(self)
    }

    /// Resolves `reference` into a constructed unit and one of its entry
    /// points. Each call constructs a fresh unit instance.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedHandler, HarnessError> {
        let reference = HandlerReference::parse(reference)?;
        let unit = self
            .units
            .get(&reference.unit)
            .ok_or_else(|| HarnessError::UnitNotFound {
                unit: reference.unit.clone(),
            })?;
        (unit.resolve)(&reference)
    }

    /// Every `unit::entry_point` pair, sorted. Units are not constructed.
    pub fn references(&self) -> Vec<String> {
        self.units
            .iter()
            .flat_map(|(unit, entry)| {
                (entry.entry_names)()
                    .into_iter()
                    .map(move |entry_point| format!("{unit}{REFERENCE_DELIMITER}{entry_point}"))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn resolve_unit<U: HandlerUnit>(
    reference: &HandlerReference,
) -> Result<ResolvedHandler, HarnessError> {
    let instance = U::construct().map_err(|source| HarnessError::UnitConstruction {
        unit: reference.unit.clone(),
        source,
    })?;

    let mut table = EntryTable::new();
    U::entry_points(&mut table);

    let entry = table
        .entries
        .remove(&reference.entry_point)
        .ok_or_else(|| HarnessError::EntryPointNotFound {
            unit: reference.unit.clone(),
            entry_point: reference.entry_point.clone(),
        })?;

    let input_shape = entry
        .input
        .map_err(|reason| HarnessError::SignatureMismatch {
            unit: reference.unit.clone(),
            entry_point: reference.entry_point.clone(),
            reason: format!("takes an input the harness cannot decode: {reason}"),
        })?;

    let instance = Arc::new(instance);
    let binder = entry.binder;
    Ok(ResolvedHandler {
        reference: reference.clone(),
        input_shape,
        binder: Box::new(move |decoded| binder(Arc::clone(&instance), decoded)),
    })
}

fn entry_names<U: HandlerUnit>() -> Vec<String> {
    let mut table = EntryTable::<U>::new();
    U::entry_points(&mut table);
    table.entries.into_keys().collect()
}

/// A constructed unit bound to one entry point, ready for a single call.
pub struct ResolvedHandler {
    reference: HandlerReference,
    input_shape: InputShape,
    binder: Binder,
}

impl ResolvedHandler {
    pub fn reference(&self) -> &HandlerReference {
        &self.reference
    }

    pub fn input_shape(&self) -> &InputShape {
        &self.input_shape
    }

    /// Binds decoded input to the entry point's concrete input type.
    pub(crate) fn bind(&self, decoded: DecodedInput) -> Result<BoundCall, HarnessError> {
        (self.binder)(decoded)
    }
}

impl fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("reference", &self.reference)
            .field("input_shape", &self.input_shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use serde::Deserialize;

    use super::*;
    use crate::context::build_context;

    thread_local! {
        pub(crate) static CONSTRUCTIONS: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct Pair {
        pub(crate) left: Option<String>,
        pub(crate) right: Option<String>,
    }

    pub(crate) struct Joiner {
        separator: String,
    }

    impl HandlerUnit for Joiner {
        fn construct() -> Result<Self, HandlerError> {
            CONSTRUCTIONS.with(|count| count.set(count.get() + 1));
            Ok(Self {
                separator: "-".to_string(),
            })
        }

        fn entry_points(table: &mut EntryTable<Self>) {
            table
                .handler("join", |unit: &Joiner, pair: Pair, _context: &MockContext| {
                    Ok::<_, HandlerError>(format!(
                        "{}{}{}",
                        pair.left.unwrap_or_default(),
                        unit.separator,
                        pair.right.unwrap_or_default()
                    ))
                })
                .handler("shout", |_unit: &Joiner, text: String, _context: &MockContext| {
                    Ok::<_, HandlerError>(text.to_uppercase())
                })
                .handler(
                    "request",
                    |_unit: &Joiner, _text: String, context: &MockContext| {
                        Ok::<_, HandlerError>(context.aws_request_id().to_string())
                    },
                )
                .handler("fail", |_unit: &Joiner, _text: String, _context: &MockContext| {
                    Err::<String, _>("left and right disagree")
                })
                .handler("panic", |_unit: &Joiner, text: String, _context: &MockContext| {
                    if text.is_empty() {
                        panic!("joiner exploded");
                    }
                    Ok::<_, HandlerError>(text)
                })
                .handler("count", |_unit: &Joiner, values: Vec<u32>, _context: &MockContext| {
                    Ok::<_, HandlerError>(values.len())
                })
                .handler_async(
                    "later",
                    |unit: Arc<Joiner>, pair: Pair, context: MockContext| async move {
                        tokio::task::yield_now().await;
                        Ok::<_, HandlerError>(format!(
                            "{}{}{}",
                            pair.left.unwrap_or_default(),
                            unit.separator,
                            context.function_name()
                        ))
                    },
                );
        }
    }

    pub(crate) struct Broken;

    impl HandlerUnit for Broken {
        fn construct() -> Result<Self, HandlerError> {
            Err("missing configuration".into())
        }

        fn entry_points(table: &mut EntryTable<Self>) {
            table.handler("handler", |_unit: &Broken, text: String, _context: &MockContext| {
                Ok::<_, HandlerError>(text)
            });
        }
    }

    struct Twice;

    impl HandlerUnit for Twice {
        fn construct() -> Result<Self, HandlerError> {
            Ok(Self)
        }

        fn entry_points(table: &mut EntryTable<Self>) {
            table
                .handler("handler", |_unit: &Twice, text: String, _context: &MockContext| {
                    Ok::<_, HandlerError>(text)
                })
                .handler("handler", |_unit: &Twice, _text: String, _context: &MockContext| {
                    Ok::<_, HandlerError>("second")
                });
        }
    }

    pub(crate) fn test_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register::<Joiner>("text.Joiner")
            .expect("joiner registers")
            .register::<Broken>("text.Broken")
            .expect("broken registers");
        registry
    }

    fn call(handler: &ResolvedHandler, raw: &str) -> Result<String, HandlerError> {
        let shape = handler.input_shape().clone();
        let decoded = DecodedInput::decode(raw, &shape).expect("decode");
        let call = handler.bind(decoded).expect("bind");
        futures::executor::block_on(call(build_context()))
    }

    #[test]
    fn resolves_structured_entry_point_with_declared_shape() {
        let handler = test_registry().resolve("text.Joiner::join").expect("resolves");
        assert_eq!(
            handler.input_shape(),
            &InputShape::Structured {
                type_name: "Pair",
                fields: &["left", "right"],
            }
        );
        assert_eq!(call(&handler, r#"{"left":"a","right":"b"}"#).expect("call"), "a-b");
    }

    #[test]
    fn resolves_raw_entry_point() {
        let handler = test_registry().resolve("text.Joiner::shout").expect("resolves");
        assert_eq!(handler.input_shape(), &InputShape::Raw);
        assert_eq!(call(&handler, "hey").expect("call"), "HEY");
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let error = test_registry().resolve("bad::format").expect_err("should fail");
        assert_eq!(error.kind(), "UnitNotFoundError");
    }

    #[test]
    fn unknown_entry_point_is_reported() {
        let error = test_registry()
            .resolve("text.Joiner::missing")
            .expect_err("should fail");
        assert_eq!(error.kind(), "EntryPointNotFoundError");
    }

    #[test]
    fn unsupported_input_type_is_a_signature_mismatch() {
        let error = test_registry()
            .resolve("text.Joiner::count")
            .expect_err("should fail");
        assert_eq!(error.kind(), "SignatureMismatchError");
        assert!(error.to_string().contains("text.Joiner::count"));
    }

    #[test]
    fn construction_failure_is_reported_with_cause() {
        let error = test_registry()
            .resolve("text.Broken::handler")
            .expect_err("should fail");
        assert_eq!(error.kind(), "UnitConstructionError");
        assert!(error.to_string().contains("missing configuration"));
    }

    #[test]
    fn malformed_reference_fails_before_lookup() {
        let error = test_registry()
            .resolve("text.Joiner.join")
            .expect_err("should fail");
        assert_eq!(error.kind(), "MalformedReferenceError");
    }

    #[test]
    fn each_resolution_constructs_a_fresh_unit() {
        let registry = test_registry();
        let before = CONSTRUCTIONS.with(Cell::get);
        registry.resolve("text.Joiner::join").expect("first");
        registry.resolve("text.Joiner::join").expect("second");
        assert_eq!(CONSTRUCTIONS.with(Cell::get), before + 2);
    }

    #[test]
    fn references_lists_every_entry_point_without_constructing() {
        let registry = test_registry();
        let before = CONSTRUCTIONS.with(Cell::get);
        let references = registry.references();
        assert_eq!(CONSTRUCTIONS.with(Cell::get), before);
        assert!(references.contains(&"text.Broken::handler".to_string()));
        assert!(references.contains(&"text.Joiner::later".to_string()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_duplicate_and_invalid_unit_names() {
        let mut registry = test_registry();
        let duplicate = registry
            .register::<Joiner>("text.Joiner")
            .err()
            .expect("duplicate should fail");
        assert_eq!(
            duplicate,
            RegistrationError::DuplicateUnit("text.Joiner".to_string())
        );

        let invalid = registry
            .register::<Joiner>("text::Joiner")
            .err()
            .expect("invalid name should fail");
        assert_eq!(
            invalid,
            RegistrationError::InvalidUnitName("text::Joiner".to_string())
        );
    }

    #[test]
    fn rejects_units_declaring_an_entry_point_twice() {
        let mut registry = Registry::new();
        let error = registry
            .register::<Twice>("text.Twice")
            .err()
            .expect("duplicate entry point should fail");
        assert_eq!(
            error,
            RegistrationError::DuplicateEntryPoint {
                unit: "text.Twice".to_string(),
                entry_point: "handler".to_string(),
            }
        );
        assert!(registry.is_empty());
    }
}
