//! Behaviour of [SecurityModel] as seen by the evaluation runtime.

use std::sync::Arc;

use secl_eval::{
    Condition, Context, FieldEventType, FieldValue, Match, Model, Operator, RegisterId,
    RelationalOperator, Rule, ScalarCache, SeclError,
};

use crate::{
    test_utils::{CountingResolvers, exec_event, lineage, open_event, with_lineage},
    *,
};

fn context<'a>(event: &'a Event, resolvers: &'a CountingResolvers) -> Context<'a, SecurityModel> {
    let resolvers: &'a (dyn Resolvers + 'static) = resolvers;
    Context::new(event, resolvers)
}

fn get(event: &Event, resolvers: &CountingResolvers, field: &str) -> FieldValue {
    SecurityModel
        .get_value(&context(event, resolvers), field)
        .unwrap()
}

fn cmp(field: &str, op: RelationalOperator, value: &str) -> Condition {
    Condition::Base {
        field: field.to_string(),
        register: None,
        op: Operator::Relational(op),
        value: Match::Value(value.to_string()),
    }
}

fn eq(field: &str, value: &str) -> Condition {
    cmp(field, RelationalOperator::Equals, value)
}

fn and(l: Condition, r: Condition) -> Condition {
    Condition::And {
        l: Box::new(l),
        r: Box::new(r),
    }
}

fn or(l: Condition, r: Condition) -> Condition {
    Condition::Or {
        l: Box::new(l),
        r: Box::new(r),
    }
}

fn compile(condition: Condition) -> secl_eval::CompiledRule<SecurityModel> {
    Rule {
        name: "test".to_string(),
        condition,
    }
    .compile(&SecurityModel)
    .unwrap()
}

/// An event carrying a zeroed payload of `event_type`.
fn event_of(event_type: EventType) -> Event {
    let payload = match event_type {
        EventType::Capset => Payload::Capset(Default::default()),
        EventType::Chmod => Payload::Chmod(Default::default()),
        EventType::Chown => Payload::Chown(Default::default()),
        EventType::Exec => Payload::Exec(Default::default()),
        EventType::Link => Payload::Link(Default::default()),
        EventType::Mkdir => Payload::Mkdir(Default::default()),
        EventType::Open => Payload::Open(Default::default()),
        EventType::RemoveXAttr => Payload::RemoveXAttr(Default::default()),
        EventType::Rename => Payload::Rename(Default::default()),
        EventType::Rmdir => Payload::Rmdir(Default::default()),
        EventType::SetGid => Payload::SetGid(Default::default()),
        EventType::SetUid => Payload::SetUid(Default::default()),
        EventType::SetXAttr => Payload::SetXAttr(Default::default()),
        EventType::Unlink => Payload::Unlink(Default::default()),
        EventType::Utimes => Payload::Utimes(Default::default()),
    };
    Event::new(payload)
}

fn event_for(field: &str) -> Event {
    match SecurityModel.get_field_event_type(field).unwrap() {
        FieldEventType::Any => open_event(1, 0o600),
        FieldEventType::Only(event_type) => event_of(event_type),
    }
}

#[test]
fn every_field_agrees_with_its_evaluator() {
    let model = SecurityModel;
    let resolvers = CountingResolvers::new();
    let names = model.get_all_field_names();
    assert!(names.len() > 200);

    for field in names {
        let evaluator = model.get_evaluator(field, None).unwrap();
        let field_type = model.get_field_type(field).unwrap();
        assert_eq!(evaluator.field(), field);
        assert_eq!(evaluator.field_type(), field_type, "{field}");

        let event = event_for(field);
        let value = get(&event, &resolvers, field);
        assert_eq!(value.field_type(), field_type, "{field}");
        assert_eq!(value.is_array(), evaluator.is_array(), "{field}");
    }
}

#[test]
fn event_types_cover_every_payload() {
    let event_types = SecurityModel.get_event_types();
    assert_eq!(event_types.len(), 15);
    for event_type in event_types {
        assert_eq!(SecurityModel.event_type_of(&event_of(event_type)), event_type);
        let retval = format!("{event_type}.retval");
        let has_syscall = !matches!(
            event_type,
            EventType::Capset | EventType::Exec | EventType::SetGid | EventType::SetUid
        );
        assert_eq!(SecurityModel.get_field_type(&retval).is_ok(), has_syscall, "{retval}");
    }
}

#[test]
fn unknown_fields_fail_every_lookup() {
    let model = SecurityModel;
    let not_found = |field: &str| SeclError::field_not_found(field);

    for field in ["open.file.nope", "open.file", "process.ancestors", "", "exec.pid"] {
        assert_eq!(model.get_evaluator(field, None).err(), Some(not_found(field)));
        assert_eq!(model.get_field_type(field), Err(not_found(field)));
        assert_eq!(model.get_field_event_type(field), Err(not_found(field)));

        let mut event = open_event(1, 0);
        assert_eq!(
            model.set_value(&mut event, field, FieldValue::Int(1)),
            Err(not_found(field))
        );
        assert_eq!(event, open_event(1, 0));
    }
}

#[test]
fn scalar_reads_are_idempotent() {
    let resolvers = CountingResolvers::new();
    let event = open_event(42, 0o644);
    let ctx = context(&event, &resolvers);

    let first = SecurityModel.get_value(&ctx, "open.file.path").unwrap();
    let second = SecurityModel.get_value(&ctx, "open.file.path").unwrap();
    assert_eq!(first, FieldValue::String("/tmp/file42".to_string()));
    assert_eq!(first, second);
    assert_eq!(resolvers.calls("file_path"), 1);

    // Stored on the event, a new pass doesn't resolve again.
    assert_eq!(get(&event, &resolvers, "open.file.path"), first);
    assert_eq!(resolvers.calls("file_path"), 1);
    assert_eq!(
        event.payload.open().and_then(|open| open.file.path.get().cloned()),
        Some("/tmp/file42".to_string())
    );
}

#[test]
fn disabled_scalar_cache_resolves_every_time() {
    let resolvers = CountingResolvers::new();
    let event = open_event(42, 0o644);
    let ctx = context(&event, &resolvers).with_scalar_cache(ScalarCache::Disabled);

    for _ in 0..3 {
        assert_eq!(
            SecurityModel.get_value(&ctx, "open.file.user").unwrap(),
            FieldValue::String("root".to_string())
        );
    }
    assert_eq!(resolvers.calls("user"), 3);
    assert!(!event.payload.open().unwrap().file.fields.user.is_resolved());

    // Values already on the event are honored.
    let mut event = open_event(42, 0o644);
    event.payload.open_mut().file = FileEvent::new(42, 1).with_path("/etc/shadow");
    let ctx = context(&event, &resolvers).with_scalar_cache(ScalarCache::Disabled);
    assert_eq!(
        SecurityModel.get_value(&ctx, "open.file.path").unwrap(),
        FieldValue::String("/etc/shadow".to_string())
    );
    assert_eq!(resolvers.calls("file_path"), 0);
}

#[test]
fn ancestor_values_nearest_first() {
    let resolvers = CountingResolvers::new();
    let event = with_lineage(open_event(1, 0), 100, &[200, 300]);

    assert_eq!(
        get(&event, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![200, 300])
    );
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.comm"),
        FieldValue::StringArray(vec!["proc200".to_string(), "proc300".to_string()])
    );
    assert_eq!(get(&event, &resolvers, "process.pid"), FieldValue::Int(100));
}

#[test]
fn empty_lineage() {
    let resolvers = CountingResolvers::new();
    let event = open_event(1, 0);

    assert_eq!(
        get(&event, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![])
    );
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.user"),
        FieldValue::StringArray(vec![])
    );
    assert_eq!(resolvers.total_calls(), 0);

    let rule = compile(eq("process.ancestors.pid", "1"));
    assert!(!rule.is_match(&context(&event, &resolvers)));
}

#[test]
fn ancestor_arrays_are_cached_per_context() {
    let resolvers = CountingResolvers::new();
    let event = with_lineage(open_event(1, 0), 100, &[200, 300]);
    let expected = FieldValue::StringArray(vec!["user200".to_string(), "user300".to_string()]);

    let ctx = context(&event, &resolvers);
    assert_eq!(SecurityModel.get_value(&ctx, "process.ancestors.user").unwrap(), expected);
    assert_eq!(SecurityModel.get_value(&ctx, "process.ancestors.user").unwrap(), expected);
    assert_eq!(resolvers.calls("user"), 2);
    assert!(ctx.is_cached("process.ancestors.user"));

    // Ancestors are shared snapshots: nothing is stored on them.
    let parent = event.process_context.ancestor.as_ref().unwrap();
    assert!(!parent.process_context.process.credentials.user.is_resolved());

    let ctx = context(&event, &resolvers);
    assert_eq!(SecurityModel.get_value(&ctx, "process.ancestors.user").unwrap(), expected);
    assert_eq!(resolvers.calls("user"), 4);
}

#[test]
fn rules_share_ancestor_traversals() {
    let resolvers = CountingResolvers::new();
    let event = with_lineage(open_event(1, 0), 100, &[200, 300]);
    let first = compile(eq("process.ancestors.user", "user300"));
    let second = compile(eq("process.ancestors.user", "user999"));

    let ctx = context(&event, &resolvers);
    assert!(first.is_match(&ctx));
    assert!(!second.is_match(&ctx));
    assert_eq!(resolvers.calls("user"), 2);
}

#[test]
fn open_rule_end_to_end() {
    let resolvers = CountingResolvers::new();
    let rule = compile(and(
        eq("open.file.inode", "42"),
        eq("open.file.mode", "0o644"),
    ));
    assert_eq!(rule.event_type(), FieldEventType::Only(EventType::Open));

    let event = open_event(42, 0o644);
    assert!(rule.is_match(&context(&event, &resolvers)));

    let event = open_event(7, 0o644);
    assert!(!rule.is_match(&context(&event, &resolvers)));
    assert_eq!(resolvers.total_calls(), 0);
}

#[test]
fn cheap_operands_short_circuit_resolvers() {
    let resolvers = CountingResolvers::new();
    let event = open_event(7, 0o644);

    let rule = compile(and(
        eq("open.file.path", "/tmp/file42"),
        eq("open.file.inode", "42"),
    ));
    assert!(!rule.is_match(&context(&event, &resolvers)));
    assert_eq!(resolvers.total_calls(), 0);

    let rule = compile(or(
        eq("process.ancestors.user", "root"),
        eq("open.file.inode", "7"),
    ));
    assert!(rule.is_match(&context(&event, &resolvers)));
    assert_eq!(resolvers.total_calls(), 0);

    let rule = compile(and(
        eq("open.file.path", "/tmp/file7"),
        eq("open.file.inode", "7"),
    ));
    assert!(rule.is_match(&context(&event, &resolvers)));
    assert_eq!(resolvers.calls("file_path"), 1);
}

#[test]
fn ancestor_rule_end_to_end() {
    let resolvers = CountingResolvers::new();
    let event = with_lineage(open_event(1, 0), 100, &[200, 300]);

    let rule = compile(eq("process.ancestors.pid", "300"));
    assert_eq!(rule.event_type(), FieldEventType::Any);
    assert!(rule.is_match(&context(&event, &resolvers)));

    let rule = compile(cmp("process.ancestors.pid", RelationalOperator::Greater, "300"));
    assert!(!rule.is_match(&context(&event, &resolvers)));
}

#[test]
fn quantifier_binds_one_ancestor_at_a_time() {
    let resolvers = CountingResolvers::new();
    let mut event = with_lineage(open_event(1, 0), 100, &[200, 300]);
    SecurityModel
        .set_value(
            &mut event,
            "process.ancestors.comm",
            FieldValue::StringArray(vec!["bash".to_string(), "sshd".to_string()]),
        )
        .unwrap();

    let bound = |field: &str, value: &str| Condition::Base {
        field: field.to_string(),
        register: Some(RegisterId(0)),
        op: Operator::Relational(RelationalOperator::Equals),
        value: Match::Value(value.to_string()),
    };
    let quantified = |pid: &str, comm: &str| Condition::Any {
        register: RegisterId(0),
        iterator: ANCESTORS_ITERATOR.to_string(),
        inner: Box::new(and(
            bound("process.ancestors.pid", pid),
            bound("process.ancestors.comm", comm),
        )),
    };

    let rule = compile(quantified("300", "sshd"));
    assert!(rule.is_match(&context(&event, &resolvers)));

    // Both values exist in the lineage, on different ancestors.
    let rule = compile(quantified("200", "sshd"));
    assert!(!rule.is_match(&context(&event, &resolvers)));
    let rule = compile(and(
        eq("process.ancestors.pid", "200"),
        eq("process.ancestors.comm", "sshd"),
    ));
    assert!(rule.is_match(&context(&event, &resolvers)));
}

#[test]
fn identity_fields_match_any_event_type() {
    let resolvers = CountingResolvers::new();
    let rule = compile(and(eq("container.id", ""), eq("process.file.user", "root")));
    assert_eq!(rule.event_type(), FieldEventType::Any);

    for event_type in SecurityModel.get_event_types() {
        assert!(rule.is_match(&context(&event_of(event_type), &resolvers)));
    }
}

#[test]
fn fields_of_another_payload_read_zero_values() {
    let resolvers = CountingResolvers::new();
    let event = exec_event("ls");

    assert_eq!(get(&event, &resolvers, "open.file.inode"), FieldValue::Int(0));
    assert_eq!(
        get(&event, &resolvers, "open.file.path"),
        FieldValue::String(String::new())
    );
    assert_eq!(get(&event, &resolvers, "setuid.user"), FieldValue::String(String::new()));
    assert_eq!(resolvers.total_calls(), 0);
}

#[test]
fn set_then_get_every_field() {
    let model = SecurityModel;
    let resolvers = CountingResolvers::new();

    for info in model.fields() {
        let field = info.name;
        let value = match (info.field_type, info.is_array) {
            (secl_eval::FieldType::Int, false) => FieldValue::Int(7),
            (secl_eval::FieldType::Int, true) => FieldValue::IntArray(vec![7, 8]),
            (secl_eval::FieldType::String, false) => FieldValue::String("value".to_string()),
            (secl_eval::FieldType::String, true) => {
                FieldValue::StringArray(vec!["a".to_string(), "b".to_string()])
            }
            (secl_eval::FieldType::Bool, _) => FieldValue::Bool(true),
        };

        let mut event = event_for(field);
        model.set_value(&mut event, field, value.clone()).unwrap();
        assert_eq!(get(&event, &resolvers, field), value, "{field}");
    }
}

#[test]
fn integer_ranges() {
    let model = SecurityModel;
    let resolvers = CountingResolvers::new();
    let mut event = open_event(1, 0);

    assert_eq!(
        model.set_value(&mut event, "open.file.mode", FieldValue::Int(0x1_0000)),
        Err(SeclError::ValueOutOfRange {
            field: "open.file.mode".to_string(),
            value: 0x1_0000,
        })
    );
    assert_eq!(
        model.set_value(&mut event, "process.pid", FieldValue::Int(-1)),
        Err(SeclError::ValueOutOfRange {
            field: "process.pid".to_string(),
            value: -1,
        })
    );
    assert_eq!(event.payload.open().unwrap().file.fields.mode, 0);

    // 64 bits fields are bit-cast.
    model
        .set_value(&mut event, "open.file.inode", FieldValue::Int(-1))
        .unwrap();
    assert_eq!(event.payload.open().unwrap().file.fields.inode, u64::MAX);
    assert_eq!(get(&event, &resolvers, "open.file.inode"), FieldValue::Int(-1));

    let mut event = event_of(EventType::Capset);
    model
        .set_value(&mut event, "capset.cap_effective", FieldValue::Int(i64::MIN))
        .unwrap();
    assert_eq!(event.payload.capset().unwrap().cap_effective, 1 << 63);
    assert_eq!(
        get(&event, &resolvers, "capset.cap_effective"),
        FieldValue::Int(i64::MIN)
    );

    // chown ids are signed, -1 leaves the owner unchanged.
    let mut event = event_of(EventType::Chown);
    model
        .set_value(&mut event, "chown.file.destination.uid", FieldValue::Int(-1))
        .unwrap();
    assert_eq!(
        get(&event, &resolvers, "chown.file.destination.user"),
        FieldValue::String(String::new())
    );
    assert_eq!(resolvers.calls("user"), 0);
}

#[test]
fn value_type_mismatch_names_the_backing_attribute() {
    let model = SecurityModel;
    let mut event = event_of(EventType::Chmod);

    assert_eq!(
        model.set_value(
            &mut event,
            "open.file.inode",
            FieldValue::String("42".to_string())
        ),
        Err(SeclError::ValueTypeMismatch {
            field: "Open.file.fields.inode".to_string(),
        })
    );
    // Rejected before touching the event.
    assert_eq!(event.event_type(), EventType::Chmod);

    assert_eq!(
        model.set_value(
            &mut event,
            "process.ancestors.pid",
            FieldValue::StringArray(vec!["1".to_string()])
        ),
        Err(SeclError::ValueTypeMismatch {
            field: "ancestor.process_context.pid".to_string(),
        })
    );
    assert!(event.process_context.ancestor.is_none());
}

#[test]
fn set_value_switches_payload() {
    let resolvers = CountingResolvers::new();
    let mut event = event_of(EventType::Chmod);

    SecurityModel
        .set_value(&mut event, "open.file.inode", FieldValue::Int(5))
        .unwrap();
    assert_eq!(event.event_type(), EventType::Open);
    assert_eq!(get(&event, &resolvers, "open.file.inode"), FieldValue::Int(5));
}

#[test]
fn set_value_on_ancestors() {
    let model = SecurityModel;
    let resolvers = CountingResolvers::new();

    // A scalar creates the immediate ancestor.
    let mut event = open_event(1, 0);
    model
        .set_value(&mut event, "process.ancestors.uid", FieldValue::Int(1000))
        .unwrap();
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.uid"),
        FieldValue::IntArray(vec![1000])
    );

    // Shared entries are copied on write.
    let original = with_lineage(open_event(1, 0), 100, &[200, 300]);
    let mut event = original.clone();
    model
        .set_value(
            &mut event,
            "process.ancestors.comm",
            FieldValue::String("bash".to_string()),
        )
        .unwrap();
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.comm"),
        FieldValue::StringArray(vec!["bash".to_string(), "proc300".to_string()])
    );
    assert_eq!(
        get(&original, &resolvers, "process.ancestors.comm"),
        FieldValue::StringArray(vec!["proc200".to_string(), "proc300".to_string()])
    );
    assert!(Arc::ptr_eq(
        event.process_context.ancestor.as_ref().unwrap().ancestor().unwrap(),
        original.process_context.ancestor.as_ref().unwrap().ancestor().unwrap(),
    ));
    assert_eq!(lineage(&[]), None);
}

#[test]
fn arrays_replace_the_whole_lineage() {
    let model = SecurityModel;
    let resolvers = CountingResolvers::new();
    let original = with_lineage(open_event(1, 0), 100, &[200, 300]);

    let mut event = original.clone();
    model
        .set_value(&mut event, "process.ancestors.pid", FieldValue::IntArray(vec![7]))
        .unwrap();
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![7])
    );
    assert_eq!(
        get(&original, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![200, 300])
    );

    model
        .set_value(
            &mut event,
            "process.ancestors.pid",
            FieldValue::IntArray(vec![7, 8, 9]),
        )
        .unwrap();
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![7, 8, 9])
    );

    let mut event = original.clone();
    assert_eq!(
        model.set_value(
            &mut event,
            "process.ancestors.pid",
            FieldValue::StringArray(vec![])
        ),
        Err(SeclError::ValueTypeMismatch {
            field: "ancestor.process_context.pid".to_string(),
        })
    );
    assert_eq!(event, original);

    model
        .set_value(&mut event, "process.ancestors.pid", FieldValue::IntArray(vec![]))
        .unwrap();
    assert!(event.process_context.ancestor.is_none());
    assert_eq!(
        get(&event, &resolvers, "process.ancestors.pid"),
        FieldValue::IntArray(vec![])
    );
}

#[test]
fn xattr_names_are_decoded_locally() {
    let resolvers = CountingResolvers::new();
    let mut event = event_of(EventType::SetXAttr);
    event.payload.setxattr_mut().name_raw = b"user.comment\0".to_vec();

    assert_eq!(
        get(&event, &resolvers, "setxattr.file.destination.name"),
        FieldValue::String("user.comment".to_string())
    );
    assert_eq!(
        get(&event, &resolvers, "setxattr.file.destination.namespace"),
        FieldValue::String("user".to_string())
    );
    assert_eq!(resolvers.total_calls(), 0);
}

#[test]
fn exec_arguments() {
    let resolvers = CountingResolvers::new();
    let event = exec_event("ls");

    let rule = compile(Condition::Base {
        field: "exec.args".to_string(),
        register: None,
        op: Operator::Multi(secl_eval::MultiOperator::Contains),
        value: Match::Value("ls".to_string()),
    });
    assert_eq!(rule.event_type(), FieldEventType::Only(EventType::Exec));
    assert!(rule.is_match(&context(&event, &resolvers)));
    assert_eq!(get(&event, &resolvers, "exec.comm"), FieldValue::String("ls".to_string()));
    assert_eq!(resolvers.calls("exec_args"), 1);
}
