use iac_framework::mock::MockMonitor;
use iac_framework::monitor::{CallResponse, CheckFailure, PropertyMap, ReadResourceResponse};
use iac_framework::serialization::wire::UNKNOWN_VALUE;
use iac_framework::serialization::{ResourceReference, Value};
use iac_framework::{
    Alias, AliasSpec, CallOptions, CompletionSlot, Deployment, DeploymentSettings, Error,
    InputMap, InputValue, Output, OutputData, OutputSlots, Resource, ResourceOptions,
    ResourceTransformation, TransformationArgs, TransformationResult,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const WIDGET: &str = "pkg:index:Widget";
const NETWORK: &str = "pkg:index:Network";
const STACK_URN: &str = "urn:pulumi:dev::project::pulumi:pulumi:Stack::project-dev";

// --- Helpers ---

fn deployment(mock: &MockMonitor) -> Deployment {
    Deployment::new(mock.client(), DeploymentSettings::default())
}

fn props(entries: &[(&str, Value)]) -> PropertyMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn inputs(entries: Vec<(&str, InputValue)>) -> InputMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn widget_urn(name: &str) -> String {
    format!("urn:pulumi:dev::project::{WIDGET}::{name}")
}

fn register_widget(
    deployment: &Deployment,
    name: &str,
    args: InputMap,
    options: ResourceOptions,
) -> Resource {
    deployment
        .register_custom(WIDGET, name, &args, options, OutputSlots::new())
        .expect("widget registration starts")
}

// --- Registration requests ---

#[tokio::test]
async fn test_widget_request_payload() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1")
        .return_outputs("w1-id", props(&[("size", Value::from(3))]));
    let deployment = deployment(&mock);

    let args = inputs(vec![("size", Output::create(3).into())]);
    let widget = register_widget(&deployment, "w1", args, ResourceOptions::default());
    deployment.wait_for_registrations().await.unwrap();

    let request = mock.registration("w1").expect("w1 was registered");
    assert_eq!(request.resource_type, WIDGET);
    assert!(request.custom);
    assert_eq!(request.parent, "");
    assert!(request.dependencies.is_empty());
    assert!(request.property_dependencies.is_empty());
    assert_eq!(request.object, props(&[("size", Value::Number(3.0))]));

    let urn = widget.urn().resolve().await.unwrap();
    assert_eq!(urn.value, Some(widget_urn("w1")));
    assert_eq!(urn.resources, BTreeSet::from([widget.key()]));
    let id = widget.id().expect("custom resources have an id");
    assert_eq!(id.value().await.unwrap(), Some("w1-id".to_string()));
    mock.verify();
}

#[tokio::test]
async fn test_request_carries_resource_options() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1")
        .return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let options = ResourceOptions {
        ignore_changes: vec!["size".into()],
        delete_before_replace: true,
        additional_secret_outputs: vec!["password".into()],
        import_id: Some("existing-1".into()),
        retain_on_delete: Some(true),
        version: Some("1.2.3".into()),
        package_ref: Some("pkg-ref".into()),
        ..ResourceOptions::default()
    };
    register_widget(&deployment, "w1", InputMap::new(), options);
    deployment.wait_for_registrations().await.unwrap();

    let request = mock.registration("w1").expect("w1 was registered");
    assert_eq!(request.ignore_changes, vec!["size".to_string()]);
    assert!(request.delete_before_replace);
    assert_eq!(request.additional_secret_outputs, vec!["password".to_string()]);
    assert_eq!(request.import_id, "existing-1");
    assert_eq!(request.retain_on_delete, Some(true));
    assert_eq!(request.version, "1.2.3");
    assert_eq!(request.package_ref, "pkg-ref");
    assert_eq!(request.protect, None);
    assert!(request.accept_secrets && request.accept_resources);
    mock.verify();
}

#[tokio::test]
async fn test_outputs_resolve_from_response() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs(
        "w1-id",
        props(&[
            ("endpoint", Value::from("10.0.0.1")),
            ("replicas", Value::from("three")),
            ("token", Value::secret(Value::from("hunter2"))),
        ]),
    );
    let deployment = deployment(&mock);

    let mut outputs = OutputSlots::new();
    let endpoint = outputs.declare::<String>("endpoint").unwrap();
    let replicas = outputs.declare::<i32>("replicas").unwrap();
    let token = outputs.declare::<String>("token").unwrap();
    let missing = outputs.declare::<String>("missing").unwrap();
    let widget = deployment
        .register_custom(WIDGET, "w1", &(), ResourceOptions::default(), outputs)
        .unwrap();

    let endpoint = endpoint.resolve().await.unwrap();
    assert_eq!(endpoint.value.as_deref(), Some("10.0.0.1"));
    assert_eq!(endpoint.resources, BTreeSet::from([widget.key()]));

    // A mismatch is a warning and a zero value, never an error.
    assert_eq!(replicas.value().await.unwrap(), Some(0));
    assert_eq!(
        deployment.warnings(),
        vec![format!("Expected int but got string deserializing {WIDGET}.replicas")]
    );

    let token = token.resolve().await.unwrap();
    assert!(token.is_secret);
    assert_eq!(token.value.as_deref(), Some("hunter2"));

    // An omitted property is unknown, not a failure.
    let missing = missing.resolve().await.unwrap();
    assert!(!missing.is_known());
    assert_eq!(missing.resources, BTreeSet::from([widget.key()]));
    mock.verify();
}

#[tokio::test]
async fn test_unknown_id_during_preview() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs("", PropertyMap::new());
    let deployment = deployment(&mock);

    let widget = register_widget(&deployment, "w1", InputMap::new(), ResourceOptions::default());
    let id = widget.id().unwrap().resolve().await.unwrap();

    assert!(!id.is_known());
    assert_eq!(id.resources, BTreeSet::from([widget.key()]));
}

#[tokio::test]
async fn test_failed_registration_fails_every_slot() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1")
        .return_err(Error::rpc("RegisterResource", "quota exceeded"));
    mock.expect_register(WIDGET, "w2")
        .return_outputs("w2-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let mut outputs = OutputSlots::new();
    let size = outputs.declare::<i32>("size").unwrap();
    let failing = deployment
        .register_custom(WIDGET, "w1", &(), ResourceOptions::default(), outputs)
        .unwrap();
    let sibling = register_widget(&deployment, "w2", InputMap::new(), ResourceOptions::default());

    let expected = Error::RegistrationFailed {
        resource: "w1".to_string(),
        reason: "RegisterResource failed: quota exceeded".to_string(),
    };
    assert_eq!(size.resolve().await, Err(expected.clone()));
    assert_eq!(failing.urn().resolve().await, Err(expected.clone()));
    assert_eq!(failing.id().unwrap().resolve().await, Err(expected));

    // The sibling is unaffected.
    assert_eq!(
        sibling.urn().value().await.unwrap(),
        Some(widget_urn("w2"))
    );
    assert_eq!(
        deployment.wait_for_registrations().await,
        Err(Error::rpc("RegisterResource", "quota exceeded"))
    );
    mock.verify();
}

#[tokio::test]
async fn test_slots_resolve_once() {
    let (slot, output) = CompletionSlot::<i32>::new("size");
    slot.fail(Error::Output("engine went away".into())).unwrap();

    assert_eq!(
        slot.resolve(OutputData::known(1)),
        Err(Error::AlreadyResolved("size".to_string()))
    );
    assert_eq!(
        output.resolve().await,
        Err(Error::Output("engine went away".into()))
    );
}

#[tokio::test]
async fn test_invalid_arguments_fail_synchronously() {
    let mock = MockMonitor::new();
    let deployment = deployment(&mock);

    let empty_name =
        deployment.register_custom(WIDGET, "", &(), ResourceOptions::default(), OutputSlots::new());
    assert!(matches!(empty_name, Err(Error::InvalidArgument { .. })));

    let mut outputs = OutputSlots::new();
    outputs.declare::<i32>("size").unwrap();
    assert!(matches!(
        outputs.declare::<i32>("size"),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(deployment.arena().is_empty());
    mock.verify();
}

// --- Dependencies ---

#[tokio::test]
async fn test_dependencies_expand_through_components() {
    let mock = MockMonitor::new();
    mock.expect_register(NETWORK, "net").return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w2").return_outputs("w2-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let network = deployment
        .register_component(NETWORK, "net", ResourceOptions::default())
        .unwrap();
    let w1 = register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            parent: Some(network.clone()),
            ..ResourceOptions::default()
        },
    );
    let w2 = register_widget(
        &deployment,
        "w2",
        inputs(vec![("peer", w1.urn().clone().into())]),
        ResourceOptions {
            depends_on: vec![network.clone()],
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    let network_urn = format!("urn:pulumi:dev::project::{NETWORK}::net");
    let w1_urn = format!("urn:pulumi:dev::project::{NETWORK}${WIDGET}::w1");
    assert_eq!(w1.urn().value().await.unwrap(), Some(w1_urn.clone()));

    let w1_request = mock.registration("w1").unwrap();
    assert_eq!(w1_request.parent, network_urn);

    // The component stands for its custom children.
    let w2_request = mock.registration("w2").unwrap();
    assert_eq!(w2_request.dependencies, vec![w1_urn.clone()]);
    assert_eq!(
        w2_request.property_dependencies,
        BTreeMap::from([("peer".to_string(), vec![w1_urn.clone()])])
    );
    assert_eq!(w2_request.object["peer"], Value::from(w1_urn));
    assert_eq!(
        deployment.arena().children_of(network.key()),
        vec![w1.clone()]
    );
    assert!(deployment.arena().children_of(w2.key()).is_empty());
    mock.verify();
}

#[tokio::test]
async fn test_secrets_and_references_follow_engine_features() {
    let mock = MockMonitor::new().with_features(&[]);
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w2").return_outputs("w2-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let w1 = register_widget(&deployment, "w1", InputMap::new(), ResourceOptions::default());
    let args = inputs(vec![
        ("password", Output::create_secret("s3cr3t".to_string()).into()),
        ("peer", w1.clone().into()),
    ]);
    register_widget(&deployment, "w2", args, ResourceOptions::default());
    deployment.wait_for_registrations().await.unwrap();

    let request = mock.registration("w2").unwrap();
    assert_eq!(request.object["password"], Value::from("s3cr3t"));
    assert_eq!(request.object["peer"], Value::from("w1-id"));
    assert_eq!(request.dependencies, vec![widget_urn("w1")]);
}

#[tokio::test]
async fn test_resource_references_with_engine_support() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w2").return_outputs("w2-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let w1 = register_widget(&deployment, "w1", InputMap::new(), ResourceOptions::default());
    let args = inputs(vec![
        ("password", Output::create_secret("s3cr3t".to_string()).into()),
        ("peer", w1.into()),
    ]);
    register_widget(&deployment, "w2", args, ResourceOptions::default());
    deployment.wait_for_registrations().await.unwrap();

    let request = mock.registration("w2").unwrap();
    assert_eq!(
        request.object["password"],
        Value::secret(Value::from("s3cr3t"))
    );
    assert_eq!(
        request.object["peer"],
        Value::ResourceReference(ResourceReference {
            urn: widget_urn("w1"),
            id: Some("w1-id".to_string()),
            package_version: None,
        })
    );
}

// --- Options ---

#[tokio::test]
async fn test_transformations_rewrite_args_but_not_parent() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let tag: ResourceTransformation = Arc::new(|args: &TransformationArgs| {
        let mut rewritten = args.args.clone();
        rewritten.insert("tag".to_string(), InputValue::from("blue"));
        Some(TransformationResult {
            args: rewritten,
            options: args.options.clone(),
        })
    });
    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            transformations: vec![tag],
            ..ResourceOptions::default()
        },
    );

    let stranger = deployment.dependency_resource(&widget_urn("stranger"));
    let reparent: ResourceTransformation = Arc::new(move |args: &TransformationArgs| {
        Some(TransformationResult {
            args: args.args.clone(),
            options: ResourceOptions {
                parent: Some(stranger.clone()),
                ..args.options.clone()
            },
        })
    });
    let result = deployment.register_custom(
        WIDGET,
        "w2",
        &(),
        ResourceOptions {
            transformations: vec![reparent],
            ..ResourceOptions::default()
        },
        OutputSlots::new(),
    );
    assert_eq!(
        result.err(),
        Some(Error::TransformationChangedParent {
            resource: "w2".to_string()
        })
    );

    deployment.wait_for_registrations().await.unwrap();
    let request = mock.registration("w1").unwrap();
    assert_eq!(request.object["tag"], Value::from("blue"));
    mock.verify();
}

#[tokio::test]
async fn test_parent_transformations_run_first() {
    let mock = MockMonitor::new();
    mock.expect_register(NETWORK, "net").return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let set = |value: &'static str| -> ResourceTransformation {
        Arc::new(move |args: &TransformationArgs| {
            let mut rewritten = args.args.clone();
            rewritten.insert("tag".to_string(), InputValue::from(value));
            Some(TransformationResult {
                args: rewritten,
                options: args.options.clone(),
            })
        })
    };
    let network = deployment
        .register_component(
            NETWORK,
            "net",
            ResourceOptions {
                transformations: vec![set("inherited")],
                ..ResourceOptions::default()
            },
        )
        .unwrap();
    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            parent: Some(network),
            transformations: vec![set("local")],
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    assert_eq!(mock.registration("w1").unwrap().object["tag"], Value::from("local"));
}

#[tokio::test]
async fn test_protect_inherits_from_parent() {
    let mock = MockMonitor::new();
    mock.expect_register(NETWORK, "net").return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let network = deployment
        .register_component(
            NETWORK,
            "net",
            ResourceOptions {
                protect: Some(true),
                version: Some("1.2.3".to_string()),
                ..ResourceOptions::default()
            },
        )
        .unwrap();
    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            parent: Some(network),
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    let request = mock.registration("w1").unwrap();
    assert_eq!(request.protect, Some(true));
    assert_eq!(request.version, "1.2.3");
}

#[tokio::test]
async fn test_providers_are_inherited_by_package() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:providers:pkg", "p1")
        .return_outputs("p1-id", PropertyMap::new());
    mock.expect_register(NETWORK, "net").return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let provider = deployment
        .register_provider("pkg", "p1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    assert_eq!(provider.provider_package(), Some("pkg"));
    let network = deployment
        .register_component(
            NETWORK,
            "net",
            ResourceOptions {
                providers: vec![provider.clone()],
                ..ResourceOptions::default()
            },
        )
        .unwrap();
    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            parent: Some(network),
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    let reference = "urn:pulumi:dev::project::pulumi:providers:pkg::p1::p1-id".to_string();
    assert_eq!(mock.registration("w1").unwrap().provider, reference);
    assert_eq!(
        mock.registration("net").unwrap().providers,
        BTreeMap::from([("pkg".to_string(), reference)])
    );
    assert!(mock.registration("p1").unwrap().custom);
    mock.verify();
}

#[tokio::test]
async fn test_unknown_provider_id_uses_unknown_marker() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:providers:pkg", "p1")
        .return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("", PropertyMap::new());
    let deployment = deployment(&mock);

    let provider = deployment
        .register_provider("pkg", "p1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            provider: Some(provider),
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    assert_eq!(
        mock.registration("w1").unwrap().provider,
        format!("urn:pulumi:dev::project::pulumi:providers:pkg::p1::{UNKNOWN_VALUE}")
    );
}

#[tokio::test]
async fn test_provider_option_conflicts() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:providers:pkg", "p1")
        .return_outputs("p1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let provider = deployment
        .register_provider("pkg", "p1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    let both = deployment.register_component(
        NETWORK,
        "net",
        ResourceOptions {
            provider: Some(provider.clone()),
            providers: vec![provider],
            ..ResourceOptions::default()
        },
    );
    assert_eq!(
        both.err(),
        Some(Error::ConflictingProviders {
            resource: "net".to_string()
        })
    );

    let not_a_provider = deployment.dependency_resource(&widget_urn("other"));
    let wrong_kind = deployment.register_custom(
        WIDGET,
        "w1",
        &(),
        ResourceOptions {
            provider: Some(not_a_provider),
            ..ResourceOptions::default()
        },
        OutputSlots::new(),
    );
    assert!(matches!(wrong_kind, Err(Error::InvalidArgument { .. })));

    deployment.wait_for_registrations().await.unwrap();
    mock.verify();
}

#[tokio::test]
async fn test_custom_resource_picks_provider_from_map() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:providers:pkg", "p1")
        .return_outputs("p1-id", PropertyMap::new());
    mock.expect_register("pulumi:providers:other", "o1")
        .return_outputs("o1-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w2").return_outputs("w2-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let p1 = deployment
        .register_provider("pkg", "p1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    let o1 = deployment
        .register_provider("other", "o1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    let w1 = register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            providers: vec![o1, p1],
            ..ResourceOptions::default()
        },
    );
    // Children of w1 inherit the provider it picked
    register_widget(
        &deployment,
        "w2",
        InputMap::new(),
        ResourceOptions {
            parent: Some(w1),
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    let reference = "urn:pulumi:dev::project::pulumi:providers:pkg::p1::p1-id".to_string();
    assert_eq!(mock.registration("w1").unwrap().provider, reference);
    assert!(mock.registration("w1").unwrap().providers.is_empty());
    assert_eq!(mock.registration("w2").unwrap().provider, reference);
    mock.verify();
}

#[tokio::test]
async fn test_single_provider_wins_over_map_on_custom_resource() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:providers:pkg", "p1")
        .return_outputs("p1-id", PropertyMap::new());
    mock.expect_register("pulumi:providers:pkg", "p2")
        .return_outputs("p2-id", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    let p1 = deployment
        .register_provider("pkg", "p1", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    let p2 = deployment
        .register_provider("pkg", "p2", &(), ResourceOptions::default(), OutputSlots::new())
        .unwrap();
    let registered = deployment.register_custom(
        WIDGET,
        "w1",
        &(),
        ResourceOptions {
            provider: Some(p2),
            providers: vec![p1],
            ..ResourceOptions::default()
        },
        OutputSlots::new(),
    );
    assert!(registered.is_ok());
    deployment.wait_for_registrations().await.unwrap();

    assert_eq!(
        mock.registration("w1").unwrap().provider,
        "urn:pulumi:dev::project::pulumi:providers:pkg::p2::p2-id"
    );
    mock.verify();
}

#[tokio::test]
async fn test_aliases_collapse_to_urns() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let deployment = deployment(&mock);

    register_widget(
        &deployment,
        "w1",
        InputMap::new(),
        ResourceOptions {
            aliases: vec![
                Alias::Spec(AliasSpec {
                    name: Some("old".to_string()),
                    ..AliasSpec::default()
                }),
                Alias::Spec(AliasSpec {
                    stack: Some("prod".to_string()),
                    ..AliasSpec::default()
                }),
                Alias::Urn("urn:pulumi:dev::project::pkg:index:Gadget::g".to_string()),
            ],
            ..ResourceOptions::default()
        },
    );
    deployment.wait_for_registrations().await.unwrap();

    assert_eq!(
        mock.registration("w1").unwrap().aliases,
        vec![
            widget_urn("old"),
            format!("urn:pulumi:prod::project::{WIDGET}::w1"),
            "urn:pulumi:dev::project::pkg:index:Gadget::g".to_string(),
        ]
    );
}

// --- Reads, lookups, calls, packages ---

#[tokio::test]
async fn test_read_existing_resource_by_id() {
    let mock = MockMonitor::new();
    mock.expect_read(WIDGET, "w1").return_ok(ReadResourceResponse {
        urn: widget_urn("w1"),
        id: "existing".to_string(),
        properties: props(&[("size", Value::from(5))]),
    });
    let deployment = deployment(&mock);

    let mut outputs = OutputSlots::new();
    let size = outputs.declare::<i32>("size").unwrap();
    let widget = deployment
        .register_custom(
            WIDGET,
            "w1",
            &(),
            ResourceOptions {
                id: Some(Output::create("existing".to_string())),
                ..ResourceOptions::default()
            },
            outputs,
        )
        .unwrap();

    assert_eq!(size.value().await.unwrap(), Some(5));
    assert_eq!(
        widget.id().unwrap().value().await.unwrap(),
        Some("existing".to_string())
    );
    deployment.wait_for_registrations().await.unwrap();
    assert!(mock.registration("w1").is_none());
    mock.verify();
}

#[tokio::test]
async fn test_read_with_unknown_id_is_not_sent() {
    let mock = MockMonitor::new();
    let deployment = deployment(&mock);

    let mut outputs = OutputSlots::new();
    let size = outputs.declare::<i32>("size").unwrap();
    let widget = deployment
        .register_custom(
            WIDGET,
            "w1",
            &(),
            ResourceOptions {
                id: Some(Output::unknown()),
                ..ResourceOptions::default()
            },
            outputs,
        )
        .unwrap();

    assert!(!size.is_known().await.unwrap());
    assert!(!widget.id().unwrap().is_known().await.unwrap());
    assert!(!widget.urn().is_known().await.unwrap());
    deployment.wait_for_registrations().await.unwrap();
    assert!(mock.requests().is_empty());
    mock.verify();
}

#[tokio::test]
async fn test_run_registers_stack_and_lookups_skip_it() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:pulumi:Stack", "project-dev")
        .return_outputs("", PropertyMap::new());
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    mock.expect_read(WIDGET, "existing").return_ok(ReadResourceResponse {
        urn: widget_urn("existing"),
        id: "e-1".to_string(),
        properties: PropertyMap::new(),
    });
    mock.expect_register_outputs(STACK_URN).return_ok();
    let deployment = deployment(&mock);

    deployment
        .run(|deployment| async move {
            let w1 = deployment.register_custom(
                WIDGET,
                "w1",
                &(),
                ResourceOptions::default(),
                OutputSlots::new(),
            )?;
            deployment.register_custom(
                WIDGET,
                "existing",
                &(),
                ResourceOptions {
                    urn: Some(widget_urn("existing")),
                    ..ResourceOptions::default()
                },
                OutputSlots::new(),
            )?;
            Ok::<_, Error>(inputs(vec![("widgetUrn", w1.urn().clone().into())]))
        })
        .await
        .unwrap();

    assert_eq!(mock.registration("w1").unwrap().parent, STACK_URN);
    let lookup = mock
        .requests()
        .into_iter()
        .find_map(|request| match request {
            iac_framework::mock::RecordedRequest::Read(read) => Some(read),
            _ => None,
        })
        .unwrap();
    assert_eq!(lookup.urn, widget_urn("existing"));
    assert_eq!(lookup.parent, "");
    assert_eq!(
        deployment.stack().map(|s| s.name().to_string()),
        Some("project-dev".to_string())
    );
    mock.verify();
}

#[tokio::test]
async fn test_run_reports_program_failures() {
    let mock = MockMonitor::new();
    mock.expect_register("pulumi:pulumi:Stack", "project-dev")
        .return_outputs("", PropertyMap::new());
    let deployment = deployment(&mock);

    let result = deployment
        .run(|_| async { Err::<InputMap, _>(Error::Output("program failed".into())) })
        .await;
    assert_eq!(result, Err(Error::Output("program failed".into())));
    mock.verify();
}

#[tokio::test]
async fn test_call_sends_self_and_converts_result() {
    let mock = MockMonitor::new();
    mock.expect_register(WIDGET, "w1").return_outputs("w1-id", PropertyMap::new());
    let helper_urn = widget_urn("helper");
    mock.expect_call("pkg:index:Widget/describe").return_ok(CallResponse {
        return_values: props(&[("summary", Value::from("small widget"))]),
        return_dependencies: BTreeMap::from([("summary".to_string(), vec![helper_urn.clone()])]),
        failures: Vec::new(),
    });
    let deployment = deployment(&mock);

    let widget = register_widget(&deployment, "w1", InputMap::new(), ResourceOptions::default());
    let args = inputs(vec![("verbose", true.into())]);
    let result = deployment
        .call::<BTreeMap<String, String>>(
            "pkg:index:Widget/describe",
            &args,
            Some(&widget),
            CallOptions::default(),
        )
        .unwrap();

    let data = result.resolve().await.unwrap();
    assert_eq!(
        data.value,
        Some(BTreeMap::from([(
            "summary".to_string(),
            "small widget".to_string()
        )]))
    );
    let helper = deployment.resource_for_urn(&helper_urn);
    assert_eq!(data.resources, BTreeSet::from([helper.key()]));

    let calls = mock.calls();
    let call = &calls[0];
    assert_eq!(call.args["verbose"], Value::Bool(true));
    assert_eq!(
        call.args["__self__"],
        Value::ResourceReference(ResourceReference {
            urn: widget_urn("w1"),
            id: Some("w1-id".to_string()),
            package_version: None,
        })
    );
    assert_eq!(
        call.arg_dependencies,
        BTreeMap::from([("__self__".to_string(), vec![widget_urn("w1")])])
    );
    mock.verify();
}

#[tokio::test]
async fn test_call_check_failures() {
    let mock = MockMonitor::new();
    mock.expect_call("pkg:index:describe").return_ok(CallResponse {
        failures: vec![CheckFailure {
            property: "verbose".to_string(),
            reason: "must be a bool".to_string(),
        }],
        ..CallResponse::default()
    });
    let deployment = deployment(&mock);

    let result = deployment
        .call::<BTreeMap<String, String>>("pkg:index:describe", &(), None, CallOptions::default())
        .unwrap();
    assert_eq!(
        result.resolve().await,
        Err(Error::CallFailed {
            token: "pkg:index:describe".to_string(),
            failures: "verbose: must be a bool".to_string(),
        })
    );
}

#[tokio::test]
async fn test_remote_component_outputs_carry_engine_dependencies() {
    let mock = MockMonitor::new();
    let backing_urn = widget_urn("backing");
    let dependencies = BTreeMap::from([("endpoint".to_string(), vec![backing_urn.clone()])]);
    mock.expect_register("remote:index:Cluster", "c1")
        .respond_with(move |request| {
            assert!(request.remote);
            assert!(!request.custom);
            Ok(iac_framework::monitor::RegisterResourceResponse {
                urn: "urn:pulumi:dev::project::remote:index:Cluster::c1".to_string(),
                object: props(&[("endpoint", Value::from("https://c1"))]),
                property_dependencies: dependencies,
                ..Default::default()
            })
        });
    let deployment = deployment(&mock);

    let mut outputs = OutputSlots::new();
    let endpoint = outputs.declare::<String>("endpoint").unwrap();
    let cluster = deployment
        .register_remote_component("remote:index:Cluster", "c1", &(), ResourceOptions::default(), outputs)
        .unwrap();

    let data = endpoint.resolve().await.unwrap();
    let backing = deployment.resource_for_urn(&backing_urn);
    assert_eq!(data.value.as_deref(), Some("https://c1"));
    assert_eq!(data.resources, BTreeSet::from([cluster.key(), backing.key()]));
    assert!(cluster.id().is_none());
    mock.verify();
}

#[tokio::test]
async fn test_register_package_and_outputs() {
    let mock = MockMonitor::new();
    mock.expect_register_package("pkg").return_ok("pkg-ref-1");
    mock.expect_register(NETWORK, "net").return_outputs("", PropertyMap::new());
    let network_urn = format!("urn:pulumi:dev::project::{NETWORK}::net");
    mock.expect_register_outputs(&network_urn).return_ok();
    let deployment = deployment(&mock);

    let package_ref = deployment
        .register_package(iac_framework::monitor::RegisterPackageRequest {
            name: "pkg".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(package_ref, "pkg-ref-1");

    let network = deployment
        .register_component(
            NETWORK,
            "net",
            ResourceOptions {
                package_ref: Some(package_ref),
                ..ResourceOptions::default()
            },
        )
        .unwrap();
    deployment
        .register_outputs(&network, inputs(vec![("cidr", "10.0.0.0/16".into())]))
        .await
        .unwrap();
    deployment.wait_for_registrations().await.unwrap();

    assert_eq!(mock.registration("net").unwrap().package_ref, "pkg-ref-1");
    let outputs = mock
        .requests()
        .into_iter()
        .find_map(|request| match request {
            iac_framework::mock::RecordedRequest::RegisterOutputs(outputs) => Some(outputs),
            _ => None,
        })
        .unwrap();
    assert_eq!(outputs.outputs, props(&[("cidr", Value::from("10.0.0.0/16"))]));
    mock.verify();
}
