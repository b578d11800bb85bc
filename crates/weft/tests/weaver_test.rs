//! Integration tests for the Weaver API.
//!
//! These drive whole fixture trees through a recording provider and a schema
//! modeled on a small blog/commerce domain: users with aliases, posts and
//! comments, customers with prefixed profile factories, tags with
//! trait-scoped associations, and self-referential nodes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

use weft::{
    Arg, Association, AttrMap, FactoryDescription, Id, InMemoryRegistry, Produced, Provider,
    Strategy, TraitArg, Variation, Weaver, WeftError, attrs, template,
};

#[derive(Debug, Error)]
#[error("provider failure: {0}")]
struct ProviderFailure(&'static str);

/// An object constructed by the recording provider.
#[derive(Debug)]
struct BuiltObject {
    strategy: Strategy,
    factory: Id,
    traits: Vec<TraitArg>,
    attrs: AttrMap<Value>,
}

/// The domain value type used by these tests. Objects compare by identity,
/// which is what the positional-parent assertions need.
#[derive(Debug, Clone)]
enum Value {
    Str(&'static str),
    Null,
    Object(Rc<BuiltObject>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Records every constructed object in call order.
struct RecordingProvider {
    log: RefCell<Vec<Rc<BuiltObject>>>,
    fail_on: Cell<Option<Id>>,
}

impl RecordingProvider {
    fn new() -> Self {
        Self {
            log: RefCell::new(Vec::new()),
            fail_on: Cell::new(None),
        }
    }

    fn objects(&self) -> Vec<Rc<BuiltObject>> {
        self.log.borrow().clone()
    }

    fn make(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Value>,
    ) -> Result<Value, ProviderFailure> {
        if self.fail_on.get() == Some(factory) {
            return Err(ProviderFailure("requested failure"));
        }
        let object = Rc::new(BuiltObject {
            strategy,
            factory,
            traits: traits.to_vec(),
            attrs: attrs.clone(),
        });
        self.log.borrow_mut().push(Rc::clone(&object));
        Ok(Value::Object(object))
    }
}

impl Provider for RecordingProvider {
    type Object = Value;
    type Error = ProviderFailure;

    fn build(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Value>,
    ) -> Result<Value, ProviderFailure> {
        self.make(strategy, factory, traits, attrs)
    }

    fn build_pair(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Value>,
    ) -> Result<[Value; 2], ProviderFailure> {
        Ok([
            self.make(strategy, factory, traits, attrs)?,
            self.make(strategy, factory, traits, attrs)?,
        ])
    }

    fn build_list(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Value>,
    ) -> Result<Vec<Value>, ProviderFailure> {
        let Some(&TraitArg::Count(count)) = traits.first() else {
            return Err(ProviderFailure("list strategy requires a leading count"));
        };
        (0..count)
            .map(|_| self.make(strategy, factory, &traits[1..], attrs))
            .collect()
    }
}

fn test_registry() -> InMemoryRegistry {
    let mut registry = InMemoryRegistry::new();
    registry.define(FactoryDescription::new("user").with_aliases(["author", "commenter"]));
    registry.define(FactoryDescription::new("post").with_association("author", "author"));
    registry.define(FactoryDescription::new("comment").with_association("commenter", "commenter"));
    registry.define(FactoryDescription::new("account").with_association("user", "user"));
    registry.define(FactoryDescription::new("customer"));
    registry.define(FactoryDescription::new("premium_customer").with_parent("customer"));
    registry.define(
        FactoryDescription::new("customer_profile").with_association("customer", "customer"),
    );
    registry.define(FactoryDescription::new("profile"));
    registry.define(FactoryDescription::new("video"));
    registry.define(FactoryDescription::new("photo"));
    registry.define(
        FactoryDescription::new("tag")
            .with_trait("for_video", [Association::new("video", "taggable")])
            .with_trait("for_photo", [Association::new("photo", "taggable")]),
    );
    registry.define(
        FactoryDescription::new("node").with_trait("non_root", [Association::new("node", "parent")]),
    );
    registry
}

type TestWeaver = Weaver<Rc<InMemoryRegistry>, Rc<RecordingProvider>>;

fn setup() -> (Rc<RecordingProvider>, TestWeaver) {
    let provider = Rc::new(RecordingProvider::new());
    let weaver = Weaver::new(Rc::new(test_registry()), Rc::clone(&provider));
    (provider, weaver)
}

fn object(value: &Value) -> Rc<BuiltObject> {
    match value {
        Value::Object(object) => Rc::clone(object),
        other => panic!("expected an object, got {other:?}"),
    }
}

fn child(factory: &str, args: Vec<Arg<Value>>) -> Arg<Value> {
    Arg::from(template(Variation::Unit, factory, args, None).unwrap())
}

#[test]
fn test_build_passes_name_traits_and_attrs() {
    let (provider, weaver) = setup();
    let built = weaver
        .build(
            "user",
            vec![
                Arg::from("premium"),
                Arg::from(2u64),
                Arg::from(attrs!["name" => Value::Str("John")]),
            ],
        )
        .unwrap();

    let built = object(&built);
    assert_eq!(built.factory, Id::new("user"));
    assert_eq!(built.strategy, Strategy::Build);
    assert_eq!(
        built.traits,
        vec![TraitArg::from("premium"), TraitArg::Count(2)]
    );
    assert_eq!(built.attrs[&Id::new("name")], Value::Str("John"));
    assert_eq!(provider.objects().len(), 1);
}

#[test]
fn test_child_association_is_inferred() {
    let (provider, weaver) = setup();
    let user = weaver
        .build(
            "user",
            vec![
                child("account", vec![]),
                Arg::from(attrs!["name" => Value::Str("John")]),
            ],
        )
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[1].factory, Id::new("account"));
    assert_eq!(objects[1].attrs[&Id::new("user")], user);
}

#[test]
fn test_explicit_attr_is_not_overwritten() {
    let (provider, weaver) = setup();
    weaver
        .build(
            "user",
            vec![child("account", vec![Arg::from(attrs!["user" => Value::Null])])],
        )
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].attrs[&Id::new("user")], Value::Null);
}

#[test]
fn test_closest_compatible_ancestor_wins() {
    let (provider, weaver) = setup();
    let outer = weaver
        .build(
            "author",
            vec![child(
                "user",
                vec![
                    child("post", vec![]),
                    child("comment", vec![]),
                    child("account", vec![]),
                ],
            )],
        )
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects.len(), 5);
    let inner = Value::Object(Rc::clone(&objects[1]));

    // The `author` related name only matches the outer ancestor, which was
    // built under the alias.
    assert_eq!(objects[2].attrs[&Id::new("author")], outer);
    // Nothing in the chain is compatible with `commenter`.
    assert!(!objects[3].attrs.contains_key(&Id::new("commenter")));
    // The `user` related name matches the closer, inner ancestor.
    assert_eq!(objects[4].attrs[&Id::new("user")], inner);
}

#[test]
fn test_every_alias_resolves_against_the_same_ancestor() {
    let (provider, weaver) = setup();
    let author = weaver
        .build(
            "author",
            vec![
                child("post", vec![Arg::from(attrs!["title" => Value::Str("Hello")])]),
                child("post", vec![Arg::from(attrs!["title" => Value::Str("World")])]),
                child("account", vec![]),
            ],
        )
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].attrs[&Id::new("author")], author);
    assert_eq!(objects[2].attrs[&Id::new("author")], author);
    assert_eq!(objects[3].attrs[&Id::new("user")], author);
}

#[test]
fn test_trait_scoped_association_links_by_type() {
    let (provider, weaver) = setup();
    let photo = weaver.build("photo", vec![child("tag", vec![])]).unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].attrs[&Id::new("taggable")], photo);
}

#[test]
fn test_partial_name_completes_from_ancestor() {
    let (provider, weaver) = setup();
    // A bare `profile` factory exists, but the ancestor-prefixed candidate
    // is preferred.
    let customer = weaver
        .build("customer", vec![child("profile", vec![])])
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].factory, Id::new("customer_profile"));
    assert_eq!(objects[1].attrs[&Id::new("customer")], customer);
}

#[test]
fn test_completion_walks_the_parent_chain() {
    let (provider, weaver) = setup();
    // `premium_customer` has no prefixed factories of its own; completion
    // falls through to its parent's name.
    weaver
        .build("premium_customer", vec![child("profile", vec![])])
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].factory, Id::new("customer_profile"));
}

#[test]
fn test_list_children_link_to_positional_parents() {
    let (provider, weaver) = setup();
    let parents = weaver
        .build_list("node", 3, vec![child("node", vec![])])
        .unwrap();
    assert_eq!(parents.len(), 3);

    let objects = provider.objects();
    assert_eq!(objects.len(), 6);
    // Parents are built in one batch, then each child inside its own
    // parent's scope.
    for index in 0..3 {
        let parent = Value::Object(Rc::clone(&objects[index]));
        assert_eq!(objects[3 + index].attrs[&Id::new("parent")], parent);
    }
}

#[test]
fn test_pair_builds_children_per_object() {
    let (provider, weaver) = setup();
    let [first, second] = weaver
        .build_pair("user", vec![child("account", vec![])])
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects.len(), 4);
    assert_eq!(objects[1].attrs[&Id::new("user")], first);
    assert_eq!(objects[3].attrs[&Id::new("user")], second);
}

#[test]
fn test_finalizer_runs_once_per_produced_object() {
    let (_provider, weaver) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_in_finalizer = Rc::clone(&seen);

    let produced = weaver
        .instantiate(
            Strategy::Build,
            Variation::Pair,
            "user",
            vec![],
            Some(Rc::new(move |object: &Value| {
                seen_in_finalizer.borrow_mut().push(object.clone());
            })),
        )
        .unwrap();

    assert_eq!(*seen.borrow(), produced.into_vec());
}

#[test]
fn test_template_reuse_does_not_mutate_the_template() {
    let (provider, weaver) = setup();
    let premium = template::<Value>(
        Variation::Unit,
        "user",
        vec![Arg::from("premium")],
        None,
    )
    .unwrap();

    weaver
        .instantiate_from(
            Strategy::Build,
            &premium,
            vec![Arg::from(attrs!["name" => Value::Str("A")])],
            None,
        )
        .unwrap();
    weaver
        .instantiate_from(
            Strategy::Build,
            &premium,
            vec![Arg::from(attrs!["name" => Value::Str("B")])],
            None,
        )
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[0].traits, vec![TraitArg::from("premium")]);
    assert_eq!(objects[0].attrs[&Id::new("name")], Value::Str("A"));
    assert_eq!(objects[1].traits, vec![TraitArg::from("premium")]);
    assert_eq!(objects[1].attrs[&Id::new("name")], Value::Str("B"));
    assert_eq!(premium.traits(), &[TraitArg::from("premium")]);
    assert!(premium.attrs().is_empty());
}

#[test]
fn test_deferred_call_supplies_the_name_later() {
    let (provider, weaver) = setup();
    let pending = weaver.deferred(Strategy::Build, Variation::Unit);
    let produced = pending
        .named("user", vec![Arg::from(attrs!["name" => Value::Str("John")])])
        .unwrap();

    assert!(matches!(produced, Produced::One(_)));
    assert_eq!(provider.objects()[0].factory, Id::new("user"));
}

#[test]
fn test_scoped_objects_seed_resolution_and_completion() {
    let (provider, weaver) = setup();
    let customer = weaver.build("customer", vec![]).unwrap();

    weaver
        .scoped([(Id::new("customer"), customer.clone())], || {
            weaver.build("profile", vec![]).unwrap()
        })
        .unwrap();

    let objects = provider.objects();
    assert_eq!(objects[1].factory, Id::new("customer_profile"));
    assert_eq!(objects[1].attrs[&Id::new("customer")], customer);
}

#[test]
fn test_custom_strategy_passes_through() {
    let (provider, weaver) = setup();
    let strategy = Strategy::Custom(Id::new("json"));
    weaver
        .instantiate(strategy, Variation::Unit, "user", vec![], None)
        .unwrap();
    assert_eq!(provider.objects()[0].strategy, strategy);
}

#[test]
fn test_interleaved_constructions_are_isolated() {
    let registry = Rc::new(test_registry());
    let (provider_a, provider_b) = (
        Rc::new(RecordingProvider::new()),
        Rc::new(RecordingProvider::new()),
    );
    let weaver_a = Weaver::new(Rc::clone(&registry), Rc::clone(&provider_a));
    let weaver_b = Rc::new(Weaver::new(Rc::clone(&registry), Rc::clone(&provider_b)));

    // Construction A pauses mid-tree (in a finalizer, with its frames
    // pushed) while construction B runs start to finish on its own context.
    let b_ran = Rc::new(Cell::new(false));
    let interleave = {
        let weaver_b = Rc::clone(&weaver_b);
        let provider_b = Rc::clone(&provider_b);
        let b_ran = Rc::clone(&b_ran);
        move |_: &Value| {
            // A bare account at B's root: were A's frames visible here, the
            // `user` attribute would be inferred from A's chain.
            let bare = weaver_b.build("account", vec![]).unwrap();
            assert!(object(&bare).attrs.is_empty());

            let b_user = weaver_b
                .build("user", vec![child("account", vec![])])
                .unwrap();
            let b_objects = provider_b.objects();
            // B's child resolves against B's own ancestor only.
            assert_eq!(b_objects[2].attrs[&Id::new("user")], b_user);
            b_ran.set(true);
        }
    };

    let paused = template(Variation::Unit, "post", vec![], Some(Rc::new(interleave))).unwrap();
    let a_user = weaver_a
        .build("user", vec![Arg::from(paused), child("account", vec![])])
        .unwrap();

    assert!(b_ran.get());
    let a_objects = provider_a.objects();
    // A resumed against its own frames only.
    assert_eq!(a_objects[2].factory, Id::new("account"));
    assert_eq!(a_objects[2].attrs[&Id::new("user")], a_user);
}

#[test]
fn test_unknown_child_factory_aborts_the_walk() {
    let (provider, weaver) = setup();
    let result = weaver.build("user", vec![child("nonexistent", vec![])]);

    assert!(matches!(result, Err(WeftError::UnknownType { .. })));
    // The root was already produced; there is no rollback.
    assert_eq!(provider.objects().len(), 1);
}

#[test]
fn test_provider_error_propagates() {
    let (provider, weaver) = setup();
    provider.fail_on.set(Some(Id::new("account")));
    let result = weaver.build("user", vec![child("account", vec![])]);

    assert!(matches!(result, Err(WeftError::Provider(_))));
}

proptest::proptest! {
    /// Every list element gets its own positional parent, whatever the
    /// count.
    #[test]
    fn prop_list_children_always_link_positionally(count in 0u64..8) {
        let (provider, weaver) = setup();
        let parents = weaver
            .build_list("node", count, vec![child("node", vec![])])
            .unwrap();
        proptest::prop_assert_eq!(parents.len() as u64, count);

        let objects = provider.objects();
        for index in 0..count as usize {
            let parent = Value::Object(Rc::clone(&objects[index]));
            let linked = &objects[count as usize + index].attrs[&Id::new("parent")];
            proptest::prop_assert!(linked == &parent);
        }
    }
}

#[test]
fn test_create_strategy_is_forwarded() {
    let (provider, weaver) = setup();
    weaver.create("user", vec![]).unwrap();
    assert_eq!(provider.objects()[0].strategy, Strategy::Create);
}
