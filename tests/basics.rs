use shinobi_di::{
    key_of_type, plan_for, scopes, trait_value_of, Binding, CallbackProvider, ContainerSettings,
    DiError, KernelBuilder, Parameter, Target, TargetKind,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_constant_binding() {
    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    let mut builder = KernelBuilder::new();
    builder.add_constant(Config { port: 8080 });

    let kernel = builder.build();
    let a = kernel.get::<Config>().unwrap();
    let b = kernel.get::<Config>().unwrap();

    assert_eq!(a.port, 8080);
    assert!(Arc::ptr_eq(&a, &b)); // Same instance
}

#[test]
fn test_callback_with_dependencies() {
    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    #[derive(Debug)]
    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut builder = KernelBuilder::new();
    builder.add_constant(Config { port: 8080 });
    builder.add_callback::<Server, _>(scopes::transient(), |ctx| {
        Ok(Server {
            config: ctx.get::<Config>()?,
            name: "MyServer".to_string(),
        })
    });

    let kernel = builder.build();
    let server = kernel.get::<Server>().unwrap();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();

    let mut builder = KernelBuilder::new();
    builder.add_callback::<String, _>(scopes::transient(), move |_| {
        let mut c = counter_clone.lock().unwrap();
        *c += 1;
        Ok(format!("instance-{}", *c))
    });

    let kernel = builder.build();
    let a = kernel.get::<String>().unwrap();
    let b = kernel.get::<String>().unwrap();
    let c = kernel.get::<String>().unwrap();

    assert_eq!(*a, "instance-1");
    assert_eq!(*b, "instance-2");
    assert_eq!(*c, "instance-3");
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
}

#[test]
fn test_not_found_error() {
    struct Unregistered;

    let kernel = KernelBuilder::new().build();

    match kernel.get::<Unregistered>() {
        Err(DiError::NotFound(name)) => assert!(name.contains("Unregistered")),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_try_get_returns_none_for_missing_binding() {
    struct Unregistered;

    let kernel = KernelBuilder::new().build();
    assert!(kernel.try_get::<Unregistered>().unwrap().is_none());
}

#[test]
fn test_two_equal_bindings_are_ambiguous_for_get() {
    struct Service(&'static str);

    let mut builder = KernelBuilder::new();
    builder.add_callback::<Service, _>(scopes::transient(), |_| Ok(Service("first")));
    builder.add_callback::<Service, _>(scopes::transient(), |_| Ok(Service("second")));

    let kernel = builder.build();

    match kernel.get::<Service>() {
        Err(DiError::AmbiguousBindings(_, count)) => assert_eq!(count, 2),
        other => panic!("expected AmbiguousBindings, got {:?}", other.map(|_| ())),
    }

    // get_all tolerates multiple bindings and preserves registration order.
    let all = kernel.get_all::<Service>().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].0, "first");
    assert_eq!(all[1].0, "second");
}

#[test]
fn test_weight_breaks_binding_ties() {
    struct Service(&'static str);

    let mut builder = KernelBuilder::new();
    builder.add_binding(
        Binding::build(
            key_of_type::<Service>(),
            Arc::new(CallbackProvider::new(|_| Ok(Service("default")))),
        )
        .finish(),
    );
    builder.add_binding(
        Binding::build(
            key_of_type::<Service>(),
            Arc::new(CallbackProvider::new(|_| Ok(Service("preferred")))),
        )
        .weight(10)
        .finish(),
    );

    let kernel = builder.build();
    assert_eq!(kernel.get::<Service>().unwrap().0, "preferred");
}

#[test]
fn test_named_binding_constraint() {
    struct Port(u16);

    let mut builder = KernelBuilder::new();
    builder.add_binding(
        Binding::build(
            key_of_type::<Port>(),
            Arc::new(CallbackProvider::new(|_| Ok(Port(80)))),
        )
        .named("http")
        .finish(),
    );
    builder.add_binding(
        Binding::build(
            key_of_type::<Port>(),
            Arc::new(CallbackProvider::new(|_| Ok(Port(443)))),
        )
        .named("https")
        .finish(),
    );

    let kernel = builder.build();
    assert_eq!(kernel.get_named::<Port>("http").unwrap().0, 80);
    assert_eq!(kernel.get_named::<Port>("https").unwrap().0, 443);
    assert!(matches!(kernel.get::<Port>(), Err(DiError::AmbiguousBindings(_, 2))));
    assert!(matches!(kernel.get_named::<Port>("ftp"), Err(DiError::NotFound(_))));
}

#[test]
fn test_conditional_binding_matches_request() {
    struct Logger(&'static str);
    struct App {
        logger: Arc<Logger>,
    }

    let mut builder = KernelBuilder::new();
    // Root resolutions see the plain logger; injected dependencies get the
    // nested one.
    builder.add_binding(
        Binding::build(
            key_of_type::<Logger>(),
            Arc::new(CallbackProvider::new(|_| Ok(Logger("root")))),
        )
        .when(|req| req.target().is_none())
        .finish(),
    );
    builder.add_binding(
        Binding::build(
            key_of_type::<Logger>(),
            Arc::new(CallbackProvider::new(|_| Ok(Logger("nested")))),
        )
        .when(|req| req.target().is_some())
        .finish(),
    );
    builder.add_callback::<App, _>(scopes::transient(), |ctx| {
        Ok(App { logger: ctx.get::<Logger>()? })
    });

    let kernel = builder.build();
    assert_eq!(kernel.get::<Logger>().unwrap().0, "root");
    assert_eq!(kernel.get::<App>().unwrap().logger.0, "nested");
}

// ===== Parameter overrides =====

trait Weapon: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Dagger;
impl Weapon for Dagger {
    fn name(&self) -> &'static str {
        "dagger"
    }
}

struct Sword;
impl Weapon for Sword {
    fn name(&self) -> &'static str {
        "sword"
    }
}

struct Samurai {
    weapon: Arc<dyn Weapon>,
}

fn samurai_kernel() -> KernelBuilder {
    let mut builder = KernelBuilder::new();
    builder.add_trait_callback::<dyn Weapon, _>(scopes::transient(), |_| {
        Ok(Arc::new(Sword) as Arc<dyn Weapon>)
    });
    builder.register_plan(plan_for::<Samurai>().constructor(
        "new",
        vec![Target::of_trait::<dyn Weapon>("weapon", TargetKind::ConstructorArgument)],
        |_ctx, values| Ok(Samurai { weapon: trait_value_of::<dyn Weapon>(&values[0])? }),
    ));
    builder.add_plan_binding::<Samurai>(scopes::transient());
    builder
}

#[test]
fn test_parameter_override_outranks_recursive_resolution() {
    let kernel = samurai_kernel().build();

    let dagger: Arc<dyn Weapon> = Arc::new(Dagger);
    let samurai = kernel
        .get_with::<Samurai>(vec![Parameter::constructor_arg_trait::<dyn Weapon>(
            "weapon",
            dagger.clone(),
        )])
        .unwrap();

    // The exact instance supplied, not a freshly resolved Sword.
    assert!(Arc::ptr_eq(&samurai.weapon, &dagger));
    assert_eq!(samurai.weapon.name(), "dagger");

    // Without the override, recursive resolution kicks in.
    let unarmed = kernel.get::<Samurai>().unwrap();
    assert_eq!(unarmed.weapon.name(), "sword");
}

#[test]
fn test_ambiguous_parameter_override_fails() {
    let kernel = samurai_kernel().build();

    let result = kernel.get_with::<Samurai>(vec![
        Parameter::constructor_arg_trait::<dyn Weapon>("weapon", Arc::new(Dagger) as Arc<dyn Weapon>),
        Parameter::typed_constructor_arg_trait::<dyn Weapon>(Arc::new(Sword) as Arc<dyn Weapon>),
    ]);

    match result {
        Err(DiError::AmbiguousOverride(target)) => assert_eq!(target, "weapon"),
        other => panic!("expected AmbiguousOverride, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_binding_level_parameter() {
    let mut builder = samurai_kernel();
    // Rebind Samurai with a binding-supplied weapon override.
    builder.add_binding(
        Binding::build(
            key_of_type::<Samurai>(),
            Arc::new(shinobi_di::StandardProvider::of::<Samurai>()),
        )
        .with_parameter(Parameter::constructor_arg_trait::<dyn Weapon>(
            "weapon",
            Arc::new(Dagger) as Arc<dyn Weapon>,
        ))
        .weight(1)
        .finish(),
    );

    let kernel = builder.build();
    assert_eq!(kernel.get::<Samurai>().unwrap().weapon.name(), "dagger");
}

// ===== Null injection policy =====

struct Widget(u32);

fn nullable_kernel(settings: ContainerSettings) -> shinobi_di::Kernel {
    let mut builder = KernelBuilder::new();
    builder.with_settings(settings);
    builder.add_binding(
        Binding::build(
            key_of_type::<Widget>(),
            Arc::new(CallbackProvider::nullable::<Widget, _>(|_| Ok(None))),
        )
        .finish(),
    );
    builder.build()
}

#[test]
fn test_provider_null_is_an_error_by_default() {
    let kernel = nullable_kernel(ContainerSettings::default());

    assert!(matches!(kernel.get::<Widget>(), Err(DiError::NullInjection(_))));
    assert!(matches!(kernel.try_get::<Widget>(), Err(DiError::NullInjection(_))));
}

#[test]
fn test_provider_null_propagates_when_allowed() {
    let kernel = nullable_kernel(ContainerSettings {
        allow_null_injection: true,
        ..ContainerSettings::default()
    });

    // try_get surfaces the empty value; the typed non-optional slot of get
    // still fails.
    assert!(kernel.try_get::<Widget>().unwrap().is_none());
    assert!(matches!(kernel.get::<Widget>(), Err(DiError::NullInjection(_))));
}

// ===== Observers =====

#[test]
fn test_observer_sees_resolution_and_release_events() {
    use shinobi_di::{Key, ResolutionObserver};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingObserver {
        resolving: AtomicUsize,
        resolved: AtomicUsize,
        released: AtomicUsize,
    }

    impl ResolutionObserver for CountingObserver {
        fn resolving(&self, _key: &Key) {
            self.resolving.fetch_add(1, Ordering::SeqCst);
        }

        fn resolved(&self, _key: &Key, _duration: Duration) {
            self.resolved.fetch_add(1, Ordering::SeqCst);
        }

        fn released(&self, _key: &Key) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Leaf;
    struct Root {
        _leaf: Arc<Leaf>,
    }

    let observer = Arc::new(CountingObserver::default());

    let mut builder = KernelBuilder::new();
    builder.with_observer(observer.clone());
    builder.add_callback::<Leaf, _>(scopes::transient(), |_| Ok(Leaf));
    builder.add_callback::<Root, _>(scopes::singleton(), |ctx| {
        Ok(Root { _leaf: ctx.get::<Leaf>()? })
    });

    let kernel = builder.build();
    let root = kernel.get::<Root>().unwrap();

    // One root resolution plus one nested Leaf resolution.
    assert_eq!(observer.resolving.load(Ordering::SeqCst), 2);
    assert_eq!(observer.resolved.load(Ordering::SeqCst), 2);

    assert!(kernel.release(&root));
    assert_eq!(observer.released.load(Ordering::SeqCst), 1);
}

// ===== Cycle detection =====

struct Chicken;
struct Egg;

fn cyclic_kernel(settings: ContainerSettings) -> shinobi_di::Kernel {
    let mut builder = KernelBuilder::new();
    builder.with_settings(settings);
    builder.add_callback::<Chicken, _>(scopes::transient(), |ctx| {
        let _ = ctx.get::<Egg>()?;
        Ok(Chicken)
    });
    builder.add_callback::<Egg, _>(scopes::transient(), |ctx| {
        let _ = ctx.get::<Chicken>()?;
        Ok(Egg)
    });
    builder.build()
}

#[test]
fn test_cycle_detection_reports_path() {
    let kernel = cyclic_kernel(ContainerSettings::default());

    match kernel.get::<Chicken>() {
        Err(DiError::Circular(path)) => {
            assert!(path.len() >= 3);
            assert!(path.first().unwrap().contains("Chicken"));
            assert!(path.last().unwrap().contains("Chicken") || path.last().unwrap().contains("Egg"));
        }
        other => panic!("expected Circular, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_depth_guard_catches_cycles_when_detection_is_off() {
    let kernel = cyclic_kernel(ContainerSettings {
        detect_cycles: false,
        max_resolution_depth: 32,
        ..ContainerSettings::default()
    });

    assert!(matches!(kernel.get::<Chicken>(), Err(DiError::DepthExceeded(_))));
}
