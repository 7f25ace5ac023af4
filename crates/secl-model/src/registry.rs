//! The field registry of [SecurityModel].
//!
//! Fields are declared once per family (file, process, credentials, payload
//! specific) as tables of typed accessors over a sub-struct of the event, then
//! registered under every prefix the family appears at: `open.file.*`,
//! `process.file.*`, `process.ancestors.file.*` and so on.

use std::{collections::BTreeMap, rc::Rc, sync::Arc};

use lazy_static::lazy_static;
use secl_eval::{
    Context, Evaluator, FieldEventType, FieldType, FieldValue, IntArrayEvaluator, RegisterId,
    ScalarCache, SeclError, StringArrayEvaluator, TypedEvaluator, Weight,
};

use crate::{
    CapsetEvent, ChmodEvent, ChownEvent, ContainerContext, Event, EventType, ExecEvent,
    FileEvent, MkdirEvent, OpenEvent, Process, ProcessCacheEntry, ProcessContext, Resolvers,
    SecurityModel, SetGidEvent, SetUidEvent, SyscallEvent, XAttrEvent,
    process::collect_ancestors,
};

lazy_static! {
    pub(crate) static ref REGISTRY: FieldRegistry = FieldRegistry::build();
}

type ModelContext<'a> = Context<'a, SecurityModel>;
type ScalarFn<T> = Arc<dyn Fn(&Event, &dyn Resolvers, ScalarCache) -> T + Send + Sync>;
type EntryFn<T> = Arc<dyn Fn(&ProcessCacheEntry, &dyn Resolvers) -> T + Send + Sync>;
type SetFn = Box<dyn Fn(&mut Event, FieldValue) -> Result<(), SeclError> + Send + Sync>;

fn scalar_fn<T>(
    f: impl Fn(&Event, &dyn Resolvers, ScalarCache) -> T + Send + Sync + 'static,
) -> ScalarFn<T> {
    Arc::new(f)
}

fn entry_fn<T>(
    f: impl Fn(&ProcessCacheEntry, &dyn Resolvers) -> T + Send + Sync + 'static,
) -> EntryFn<T> {
    Arc::new(f)
}

enum Accessor {
    Int(ScalarFn<i64>),
    String(ScalarFn<String>),
    Bool(ScalarFn<bool>),
    StringList(ScalarFn<Vec<String>>),
    AncestorInt(EntryFn<i64>),
    AncestorString(EntryFn<String>),
}

/// Static description of a registered field.
pub(crate) struct FieldDescriptor {
    name: String,
    event_type: FieldEventType<EventType>,
    weight: Weight,
    /// Cost of reading a single element, for ancestor fields bound to a register.
    element_weight: Weight,
    backing: String,
    accessor: Accessor,
    setter: SetFn,
}

impl FieldDescriptor {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn event_type(&self) -> FieldEventType<EventType> {
        self.event_type
    }

    pub(crate) fn weight(&self) -> Weight {
        self.weight
    }

    /// Attribute of the event the field reads from.
    pub(crate) fn backing(&self) -> &str {
        &self.backing
    }

    pub(crate) fn field_type(&self) -> FieldType {
        match self.accessor {
            Accessor::Int(_) | Accessor::AncestorInt(_) => FieldType::Int,
            Accessor::String(_) | Accessor::StringList(_) | Accessor::AncestorString(_) => {
                FieldType::String
            }
            Accessor::Bool(_) => FieldType::Bool,
        }
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(
            self.accessor,
            Accessor::StringList(_) | Accessor::AncestorInt(_) | Accessor::AncestorString(_)
        )
    }

    pub(crate) fn evaluator(&self, register: Option<RegisterId>) -> Evaluator<SecurityModel> {
        let field = self.name.clone();
        let weight = self.weight;

        match &self.accessor {
            Accessor::Int(get) => {
                let get = Arc::clone(get);
                Evaluator::Int(TypedEvaluator::new(field, weight, move |ctx: &ModelContext| {
                    get(ctx.event(), ctx.resolvers(), ctx.scalar_cache())
                }))
            }
            Accessor::String(get) => {
                let get = Arc::clone(get);
                Evaluator::String(TypedEvaluator::new(field, weight, move |ctx: &ModelContext| {
                    get(ctx.event(), ctx.resolvers(), ctx.scalar_cache())
                }))
            }
            Accessor::Bool(get) => {
                let get = Arc::clone(get);
                Evaluator::Bool(TypedEvaluator::new(field, weight, move |ctx: &ModelContext| {
                    get(ctx.event(), ctx.resolvers(), ctx.scalar_cache())
                }))
            }
            Accessor::StringList(get) => {
                let get = Arc::clone(get);
                let eval_fn = move |ctx: &ModelContext| -> Rc<[String]> {
                    get(ctx.event(), ctx.resolvers(), ctx.scalar_cache()).into()
                };
                Evaluator::StringArray(TypedEvaluator::new(field, weight, eval_fn))
            }
            Accessor::AncestorInt(get) => Evaluator::IntArray(ancestor_ints(
                field,
                register,
                self.element_weight,
                Arc::clone(get),
            )),
            Accessor::AncestorString(get) => Evaluator::StringArray(ancestor_strings(
                field,
                register,
                self.element_weight,
                Arc::clone(get),
            )),
        }
    }

    pub(crate) fn set(&self, event: &mut Event, value: FieldValue) -> Result<(), SeclError> {
        (self.setter)(event, value)
    }
}

// With a register, ancestor fields read the single entry bound to it and skip
// the array cache. Without, they walk the whole lineage once per context.

fn ancestor_ints(
    field: String,
    register: Option<RegisterId>,
    element_weight: Weight,
    get: EntryFn<i64>,
) -> IntArrayEvaluator<SecurityModel> {
    match register {
        Some(register) => {
            TypedEvaluator::new(field, element_weight, move |ctx: &ModelContext| {
                ctx.register(register)
                    .map(|entry| get(&entry, ctx.resolvers()))
                    .into_iter()
                    .collect::<Rc<[i64]>>()
            })
        }
        None => {
            let key = field.clone();
            TypedEvaluator::new(field, Weight::Iterator, move |ctx: &ModelContext| {
                ctx.int_array(&key, || {
                    collect_ancestors(ctx, |entry| get(entry, ctx.resolvers()))
                })
            })
        }
    }
}

fn ancestor_strings(
    field: String,
    register: Option<RegisterId>,
    element_weight: Weight,
    get: EntryFn<String>,
) -> StringArrayEvaluator<SecurityModel> {
    match register {
        Some(register) => {
            TypedEvaluator::new(field, element_weight, move |ctx: &ModelContext| {
                ctx.register(register)
                    .map(|entry| get(&entry, ctx.resolvers()))
                    .into_iter()
                    .collect::<Rc<[String]>>()
            })
        }
        None => {
            let key = field.clone();
            TypedEvaluator::new(field, Weight::Iterator, move |ctx: &ModelContext| {
                ctx.string_array(&key, || {
                    collect_ancestors(ctx, |entry| get(entry, ctx.resolvers()))
                })
            })
        }
    }
}

/// Registers `<tag>.file.*` and `<tag>.retval` for a payload with a `syscall`
/// and a file attribute.
macro_rules! register_file_operation {
    ($builder:ident, $variant:ident, $get:ident, $get_mut:ident, $file:ident) => {
        let tag = EventType::$variant.to_string();
        $builder.scalars(
            &format!("{tag}.file"),
            concat!(stringify!($variant), ".", stringify!($file)),
            FieldEventType::Only(EventType::$variant),
            file_fields(true),
            |event| event.payload.$get().map(|payload| &payload.$file),
            |event| &mut event.payload.$get_mut().$file,
        );
        $builder.scalars(
            &tag,
            concat!(stringify!($variant), ".syscall"),
            FieldEventType::Only(EventType::$variant),
            syscall_fields(),
            |event| event.payload.$get().map(|payload| &payload.syscall),
            |event| &mut event.payload.$get_mut().syscall,
        );
    };
}

/// All the fields of [SecurityModel], sorted by name.
pub(crate) struct FieldRegistry {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl FieldRegistry {
    pub(crate) fn get(&self, field: &str) -> Result<&FieldDescriptor, SeclError> {
        self.fields
            .get(field)
            .ok_or_else(|| SeclError::field_not_found(field))
    }

    pub(crate) fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    fn build() -> Self {
        let mut builder = RegistryBuilder::default();

        // Identity of the process and its container, valid for every event type.
        builder.scalars(
            "process",
            "process_context",
            FieldEventType::Any,
            context_fields(),
            |event| Some(&event.process_context),
            |event| &mut event.process_context,
        );
        builder.scalars(
            "process",
            "process_context.process",
            FieldEventType::Any,
            process_fields(),
            |event| Some(&event.process_context.process),
            |event| &mut event.process_context.process,
        );
        builder.scalars(
            "process.file",
            "process_context.process.file",
            FieldEventType::Any,
            file_fields(false),
            |event| Some(&event.process_context.process.file),
            |event| &mut event.process_context.process.file,
        );
        builder.scalars(
            "container",
            "container_context",
            FieldEventType::Any,
            container_fields(),
            |event| Some(&event.container_context),
            |event| &mut event.container_context,
        );

        builder.ancestors(
            "process.ancestors",
            "process_context",
            context_fields(),
            |entry| &entry.process_context,
            |entry| &mut entry.process_context,
        );
        builder.ancestors(
            "process.ancestors",
            "process_context.process",
            process_fields(),
            |entry| &entry.process_context.process,
            |entry| &mut entry.process_context.process,
        );
        builder.ancestors(
            "process.ancestors.file",
            "process_context.process.file",
            file_fields(false),
            |entry| &entry.process_context.process.file,
            |entry| &mut entry.process_context.process.file,
        );
        builder.ancestors(
            "process.ancestors",
            "container_context",
            container_fields(),
            |entry| &entry.container_context,
            |entry| &mut entry.container_context,
        );

        let exec = FieldEventType::Only(EventType::Exec);
        builder.scalars(
            "exec",
            "Exec.process",
            exec,
            process_fields(),
            |event| event.payload.exec().map(|exec| &exec.process),
            |event| &mut event.payload.exec_mut().process,
        );
        builder.scalars(
            "exec.file",
            "Exec.process.file",
            exec,
            file_fields(false),
            |event| event.payload.exec().map(|exec| &exec.process.file),
            |event| &mut event.payload.exec_mut().process.file,
        );
        builder.scalars(
            "exec",
            "Exec",
            exec,
            exec_fields(),
            |event| event.payload.exec(),
            |event| event.payload.exec_mut(),
        );

        register_file_operation!(builder, Chmod, chmod, chmod_mut, file);
        builder.scalars(
            "chmod",
            "Chmod",
            FieldEventType::Only(EventType::Chmod),
            chmod_fields(),
            |event| event.payload.chmod(),
            |event| event.payload.chmod_mut(),
        );

        register_file_operation!(builder, Chown, chown, chown_mut, file);
        builder.scalars(
            "chown",
            "Chown",
            FieldEventType::Only(EventType::Chown),
            chown_fields(),
            |event| event.payload.chown(),
            |event| event.payload.chown_mut(),
        );

        register_file_operation!(builder, Link, link, link_mut, source);
        builder.scalars(
            "link.file.destination",
            "Link.target",
            FieldEventType::Only(EventType::Link),
            file_fields(true),
            |event| event.payload.link().map(|link| &link.target),
            |event| &mut event.payload.link_mut().target,
        );

        register_file_operation!(builder, Mkdir, mkdir, mkdir_mut, file);
        builder.scalars(
            "mkdir",
            "Mkdir",
            FieldEventType::Only(EventType::Mkdir),
            mkdir_fields(),
            |event| event.payload.mkdir(),
            |event| event.payload.mkdir_mut(),
        );

        register_file_operation!(builder, Open, open, open_mut, file);
        builder.scalars(
            "open",
            "Open",
            FieldEventType::Only(EventType::Open),
            open_fields(),
            |event| event.payload.open(),
            |event| event.payload.open_mut(),
        );

        register_file_operation!(builder, Rename, rename, rename_mut, old);
        builder.scalars(
            "rename.file.destination",
            "Rename.new",
            FieldEventType::Only(EventType::Rename),
            file_fields(true),
            |event| event.payload.rename().map(|rename| &rename.new),
            |event| &mut event.payload.rename_mut().new,
        );

        register_file_operation!(builder, Rmdir, rmdir, rmdir_mut, file);
        register_file_operation!(builder, Unlink, unlink, unlink_mut, file);
        register_file_operation!(builder, Utimes, utimes, utimes_mut, file);

        register_file_operation!(builder, SetXAttr, setxattr, setxattr_mut, file);
        builder.scalars(
            "setxattr",
            "SetXAttr",
            FieldEventType::Only(EventType::SetXAttr),
            xattr_fields(),
            |event| event.payload.setxattr(),
            |event| event.payload.setxattr_mut(),
        );

        register_file_operation!(builder, RemoveXAttr, removexattr, removexattr_mut, file);
        builder.scalars(
            "removexattr",
            "RemoveXAttr",
            FieldEventType::Only(EventType::RemoveXAttr),
            xattr_fields(),
            |event| event.payload.removexattr(),
            |event| event.payload.removexattr_mut(),
        );

        builder.scalars(
            "setuid",
            "SetUid",
            FieldEventType::Only(EventType::SetUid),
            setuid_fields(),
            |event| event.payload.setuid(),
            |event| event.payload.setuid_mut(),
        );
        builder.scalars(
            "setgid",
            "SetGid",
            FieldEventType::Only(EventType::SetGid),
            setgid_fields(),
            |event| event.payload.setgid(),
            |event| event.payload.setgid_mut(),
        );
        builder.scalars(
            "capset",
            "Capset",
            FieldEventType::Only(EventType::Capset),
            capset_fields(),
            |event| event.payload.capset(),
            |event| event.payload.capset_mut(),
        );

        log::debug!("Field registry built with {} fields", builder.fields.len());

        Self {
            fields: builder.fields,
        }
    }
}

#[derive(Default)]
struct RegistryBuilder {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl RegistryBuilder {
    fn insert(&mut self, descriptor: FieldDescriptor) {
        let name = descriptor.name.clone();
        if self.fields.insert(name.clone(), descriptor).is_some() {
            panic!("field {name} registered twice");
        }
    }

    /// Registers the fields of a struct `S` reachable from the event, under `prefix`.
    ///
    /// `get` returns `None` when the event doesn't carry `S` (another payload), the
    /// fields then evaluate to zero values. `get_mut` switches the event payload
    /// when needed.
    fn scalars<S: 'static>(
        &mut self,
        prefix: &str,
        backing: &str,
        event_type: FieldEventType<EventType>,
        fields: Vec<Field<S>>,
        get: fn(&Event) -> Option<&S>,
        get_mut: fn(&mut Event) -> &mut S,
    ) {
        for field in fields {
            let name = format!("{prefix}.{}", field.name);
            let backing = format!("{backing}.{}", field.backing);

            let accessor = match field.get {
                Get::Int(f) => Accessor::Int(scalar_fn(move |event, resolvers, cache| {
                    get(event)
                        .map(|s| f(s, resolvers, cache.stores()))
                        .unwrap_or_default()
                })),
                Get::String(f) => Accessor::String(scalar_fn(move |event, resolvers, cache| {
                    get(event)
                        .map(|s| f(s, resolvers, cache.stores()))
                        .unwrap_or_default()
                })),
                Get::Bool(f) => Accessor::Bool(scalar_fn(move |event, resolvers, cache| {
                    get(event)
                        .map(|s| f(s, resolvers, cache.stores()))
                        .unwrap_or_default()
                })),
                Get::StringList(f) => {
                    Accessor::StringList(scalar_fn(move |event, resolvers, cache| {
                        get(event)
                            .map(|s| f(s, resolvers, cache.stores()))
                            .unwrap_or_default()
                    }))
                }
            };

            let set = field.set;
            let setter: SetFn = {
                let name = name.clone();
                let backing = backing.clone();
                Box::new(move |event: &mut Event, value: FieldValue| {
                    set.check(&value, &backing)?;
                    set.apply(get_mut(event), value, &name, &backing)
                })
            };

            self.insert(FieldDescriptor {
                name,
                event_type,
                weight: field.weight,
                element_weight: field.weight,
                backing,
                accessor,
                setter,
            });
        }
    }

    /// Registers the fields of a struct `S` of every ancestor, as arrays under `prefix`.
    ///
    /// Ancestors are shared snapshots: reads never store resolved values on them.
    /// Setting a scalar writes the immediate ancestor, setting an array writes one
    /// ancestor per element; missing entries are created.
    fn ancestors<S: 'static>(
        &mut self,
        prefix: &str,
        backing: &str,
        fields: Vec<Field<S>>,
        get: fn(&ProcessCacheEntry) -> &S,
        get_mut: fn(&mut ProcessCacheEntry) -> &mut S,
    ) {
        for field in fields {
            let name = format!("{prefix}.{}", field.name);
            let backing = format!("ancestor.{backing}.{}", field.backing);

            let accessor = match field.get {
                Get::Int(f) => Accessor::AncestorInt(entry_fn(move |entry, resolvers| {
                    f(get(entry), resolvers, false)
                })),
                Get::String(f) => Accessor::AncestorString(entry_fn(move |entry, resolvers| {
                    f(get(entry), resolvers, false)
                })),
                Get::Bool(_) | Get::StringList(_) => {
                    panic!("field {name}: ancestors only carry int and string fields")
                }
            };

            let set = field.set;
            let setter: SetFn = {
                let name = name.clone();
                let backing = backing.clone();
                Box::new(move |event: &mut Event, value: FieldValue| {
                    // An array replaces the whole lineage, a scalar only the parent.
                    let (values, whole_lineage): (Vec<FieldValue>, bool) = match value {
                        FieldValue::IntArray(values) => {
                            set.check(&FieldValue::Int(0), &backing)?;
                            (values.into_iter().map(FieldValue::Int).collect(), true)
                        }
                        FieldValue::StringArray(values) => {
                            set.check(&FieldValue::String(String::new()), &backing)?;
                            (values.into_iter().map(FieldValue::String).collect(), true)
                        }
                        scalar => {
                            set.check(&scalar, &backing)?;
                            (vec![scalar], false)
                        }
                    };

                    let mut link = &mut event.process_context.ancestor;
                    for value in values {
                        let entry = Arc::make_mut(link.get_or_insert_with(Default::default));
                        set.apply(get_mut(entry), value, &name, &backing)?;
                        link = &mut entry.process_context.ancestor;
                    }
                    if whole_lineage {
                        *link = None;
                    }
                    Ok(())
                })
            };

            self.insert(FieldDescriptor {
                name,
                event_type: FieldEventType::Any,
                weight: Weight::Iterator,
                element_weight: field.weight,
                backing,
                accessor,
                setter,
            });
        }
    }
}

/// The value doesn't fit the backing integer.
struct OutOfRange;

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T, OutOfRange> {
    T::try_from(value).map_err(|_| OutOfRange)
}

// Getters receive the struct, the resolvers and whether resolutions are stored.
type GetFn<S, T> = fn(&S, &dyn Resolvers, bool) -> T;

enum Get<S> {
    Int(GetFn<S, i64>),
    String(GetFn<S, String>),
    Bool(GetFn<S, bool>),
    StringList(GetFn<S, Vec<String>>),
}

enum Set<S> {
    Int(fn(&mut S, i64) -> Result<(), OutOfRange>),
    String(fn(&mut S, String)),
    Bool(fn(&mut S, bool)),
    StringList(fn(&mut S, Vec<String>)),
}

impl<S> Clone for Set<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Set<S> {}

impl<S> Set<S> {
    fn check(&self, value: &FieldValue, backing: &str) -> Result<(), SeclError> {
        let accepted = matches!(
            (self, value),
            (Set::Int(_), FieldValue::Int(_))
                | (Set::String(_), FieldValue::String(_))
                | (Set::Bool(_), FieldValue::Bool(_))
                | (Set::StringList(_), FieldValue::StringArray(_))
        );
        if accepted {
            Ok(())
        } else {
            Err(SeclError::ValueTypeMismatch {
                field: backing.to_string(),
            })
        }
    }

    fn apply(
        &self,
        target: &mut S,
        value: FieldValue,
        field: &str,
        backing: &str,
    ) -> Result<(), SeclError> {
        match (self, value) {
            (Set::Int(set), FieldValue::Int(value)) => {
                set(target, value).map_err(|OutOfRange| SeclError::ValueOutOfRange {
                    field: field.to_string(),
                    value,
                })
            }
            (Set::String(set), FieldValue::String(value)) => {
                set(target, value);
                Ok(())
            }
            (Set::Bool(set), FieldValue::Bool(value)) => {
                set(target, value);
                Ok(())
            }
            (Set::StringList(set), FieldValue::StringArray(value)) => {
                set(target, value);
                Ok(())
            }
            _ => Err(SeclError::ValueTypeMismatch {
                field: backing.to_string(),
            }),
        }
    }
}

/// A field of the struct `S`, relative to the prefix it gets registered at.
struct Field<S> {
    name: &'static str,
    backing: &'static str,
    weight: Weight,
    get: Get<S>,
    set: Set<S>,
}

impl<S> Field<S> {
    fn int(
        name: &'static str,
        backing: &'static str,
        weight: Weight,
        get: GetFn<S, i64>,
        set: fn(&mut S, i64) -> Result<(), OutOfRange>,
    ) -> Self {
        Self {
            name,
            backing,
            weight,
            get: Get::Int(get),
            set: Set::Int(set),
        }
    }

    fn string(
        name: &'static str,
        backing: &'static str,
        weight: Weight,
        get: GetFn<S, String>,
        set: fn(&mut S, String),
    ) -> Self {
        Self {
            name,
            backing,
            weight,
            get: Get::String(get),
            set: Set::String(set),
        }
    }

    fn boolean(
        name: &'static str,
        backing: &'static str,
        weight: Weight,
        get: GetFn<S, bool>,
        set: fn(&mut S, bool),
    ) -> Self {
        Self {
            name,
            backing,
            weight,
            get: Get::Bool(get),
            set: Set::Bool(set),
        }
    }

    fn strings(
        name: &'static str,
        backing: &'static str,
        weight: Weight,
        get: GetFn<S, Vec<String>>,
        set: fn(&mut S, Vec<String>),
    ) -> Self {
        Self {
            name,
            backing,
            weight,
            get: Get::StringList(get),
            set: Set::StringList(set),
        }
    }
}

fn file_fields(with_upper_layer: bool) -> Vec<Field<FileEvent>> {
    let mut fields: Vec<Field<FileEvent>> = vec![
        Field::string(
            "container_path",
            "container_path",
            Weight::Handler,
            |file, resolvers, store| {
                file.container_path
                    .get_or_resolve(store, || resolvers.resolve_file_container_path(file))
            },
            |file, value| file.container_path.set(value),
        ),
        Field::string(
            "filesystem",
            "filesystem",
            Weight::Handler,
            |file, resolvers, store| {
                file.filesystem
                    .get_or_resolve(store, || resolvers.resolve_file_filesystem(file))
            },
            |file, value| file.filesystem.set(value),
        ),
        Field::int(
            "gid",
            "fields.gid",
            Weight::Function,
            |file, _, _| file.fields.gid.into(),
            |file, value| {
                file.fields.gid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "group",
            "fields.group",
            Weight::Handler,
            |file, resolvers, store| {
                file.fields
                    .group
                    .get_or_resolve(store, || resolvers.resolve_group(file.fields.gid))
            },
            |file, value| file.fields.group.set(value),
        ),
        Field::int(
            "inode",
            "fields.inode",
            Weight::Function,
            |file, _, _| file.fields.inode as i64,
            |file, value| {
                file.fields.inode = value as u64;
                Ok(())
            },
        ),
        Field::int(
            "mode",
            "fields.mode",
            Weight::Function,
            |file, _, _| file.fields.mode.into(),
            |file, value| {
                file.fields.mode = narrow(value)?;
                Ok(())
            },
        ),
        Field::int(
            "mount_id",
            "fields.mount_id",
            Weight::Function,
            |file, _, _| file.fields.mount_id.into(),
            |file, value| {
                file.fields.mount_id = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "name",
            "basename",
            Weight::Handler,
            |file, resolvers, store| {
                file.basename
                    .get_or_resolve(store, || resolvers.resolve_file_basename(file))
            },
            |file, value| file.basename.set(value),
        ),
        Field::string(
            "path",
            "path",
            Weight::Handler,
            |file, resolvers, store| {
                file.path
                    .get_or_resolve(store, || resolvers.resolve_file_path(file))
            },
            |file, value| file.path.set(value),
        ),
        Field::int(
            "uid",
            "fields.uid",
            Weight::Function,
            |file, _, _| file.fields.uid.into(),
            |file, value| {
                file.fields.uid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "user",
            "fields.user",
            Weight::Handler,
            |file, resolvers, store| {
                file.fields
                    .user
                    .get_or_resolve(store, || resolvers.resolve_user(file.fields.uid))
            },
            |file, value| file.fields.user.set(value),
        ),
    ];

    if with_upper_layer {
        fields.push(Field::boolean(
            "in_upper_layer",
            "in_upper_layer",
            Weight::Handler,
            |file, resolvers, store| {
                file.in_upper_layer
                    .get_or_resolve(store, || resolvers.resolve_file_in_upper_layer(file))
            },
            |file, value| file.in_upper_layer.set(value),
        ));
    }

    fields
}

fn process_fields() -> Vec<Field<Process>> {
    vec![
        Field::int(
            "cap_effective",
            "credentials.cap_effective",
            Weight::Function,
            |process, _, _| process.credentials.cap_effective as i64,
            |process, value| {
                process.credentials.cap_effective = value as u64;
                Ok(())
            },
        ),
        Field::int(
            "cap_permitted",
            "credentials.cap_permitted",
            Weight::Function,
            |process, _, _| process.credentials.cap_permitted as i64,
            |process, value| {
                process.credentials.cap_permitted = value as u64;
                Ok(())
            },
        ),
        Field::string(
            "comm",
            "comm",
            Weight::Function,
            |process, _, _| process.comm.clone(),
            |process, value| process.comm = value,
        ),
        Field::int(
            "cookie",
            "cookie",
            Weight::Function,
            |process, _, _| process.cookie.into(),
            |process, value| {
                process.cookie = narrow(value)?;
                Ok(())
            },
        ),
        Field::int(
            "egid",
            "credentials.egid",
            Weight::Function,
            |process, _, _| process.credentials.egid.into(),
            |process, value| {
                process.credentials.egid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "egroup",
            "credentials.egroup",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .egroup
                    .get_or_resolve(store, || resolvers.resolve_group(credentials.egid))
            },
            |process, value| process.credentials.egroup.set(value),
        ),
        Field::int(
            "euid",
            "credentials.euid",
            Weight::Function,
            |process, _, _| process.credentials.euid.into(),
            |process, value| {
                process.credentials.euid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "euser",
            "credentials.euser",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .euser
                    .get_or_resolve(store, || resolvers.resolve_user(credentials.euid))
            },
            |process, value| process.credentials.euser.set(value),
        ),
        Field::int(
            "fsgid",
            "credentials.fsgid",
            Weight::Function,
            |process, _, _| process.credentials.fsgid.into(),
            |process, value| {
                process.credentials.fsgid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "fsgroup",
            "credentials.fsgroup",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .fsgroup
                    .get_or_resolve(store, || resolvers.resolve_group(credentials.fsgid))
            },
            |process, value| process.credentials.fsgroup.set(value),
        ),
        Field::int(
            "fsuid",
            "credentials.fsuid",
            Weight::Function,
            |process, _, _| process.credentials.fsuid.into(),
            |process, value| {
                process.credentials.fsuid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "fsuser",
            "credentials.fsuser",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .fsuser
                    .get_or_resolve(store, || resolvers.resolve_user(credentials.fsuid))
            },
            |process, value| process.credentials.fsuser.set(value),
        ),
        Field::int(
            "gid",
            "credentials.gid",
            Weight::Function,
            |process, _, _| process.credentials.gid.into(),
            |process, value| {
                process.credentials.gid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "group",
            "credentials.group",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .group
                    .get_or_resolve(store, || resolvers.resolve_group(credentials.gid))
            },
            |process, value| process.credentials.group.set(value),
        ),
        Field::int(
            "ppid",
            "ppid",
            Weight::Handler,
            |process, resolvers, store| {
                process
                    .ppid
                    .get_or_resolve(store, || resolvers.resolve_process_ppid(process))
                    .into()
            },
            |process, value| {
                process.ppid.set(narrow(value)?);
                Ok(())
            },
        ),
        Field::string(
            "tty_name",
            "tty_name",
            Weight::Handler,
            |process, resolvers, store| {
                process
                    .tty_name
                    .get_or_resolve(store, || resolvers.resolve_process_tty(process))
            },
            |process, value| process.tty_name.set(value),
        ),
        Field::int(
            "uid",
            "credentials.uid",
            Weight::Function,
            |process, _, _| process.credentials.uid.into(),
            |process, value| {
                process.credentials.uid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "user",
            "credentials.user",
            Weight::Handler,
            |process, resolvers, store| {
                let credentials = &process.credentials;
                credentials
                    .user
                    .get_or_resolve(store, || resolvers.resolve_user(credentials.uid))
            },
            |process, value| process.credentials.user.set(value),
        ),
    ]
}

fn context_fields() -> Vec<Field<ProcessContext>> {
    vec![
        Field::int(
            "pid",
            "pid",
            Weight::Function,
            |context, _, _| context.pid.into(),
            |context, value| {
                context.pid = narrow(value)?;
                Ok(())
            },
        ),
        Field::int(
            "tid",
            "tid",
            Weight::Function,
            |context, _, _| context.tid.into(),
            |context, value| {
                context.tid = narrow(value)?;
                Ok(())
            },
        ),
    ]
}

fn container_fields() -> Vec<Field<ContainerContext>> {
    vec![Field::string(
        "id",
        "id",
        Weight::Handler,
        |container, resolvers, store| {
            container
                .id
                .get_or_resolve(store, || resolvers.resolve_container_id(container))
        },
        |container, value| container.id.set(value),
    )]
}

fn syscall_fields() -> Vec<Field<SyscallEvent>> {
    vec![Field::int(
        "retval",
        "retval",
        Weight::Function,
        |syscall, _, _| syscall.retval,
        |syscall, value| {
            syscall.retval = value;
            Ok(())
        },
    )]
}

fn exec_fields() -> Vec<Field<ExecEvent>> {
    vec![
        Field::strings(
            "args",
            "args",
            Weight::Handler,
            |exec, resolvers, store| {
                exec.args
                    .get_or_resolve(store, || resolvers.resolve_exec_args(exec))
            },
            |exec, value| exec.args.set(value),
        ),
        Field::boolean(
            "args_truncated",
            "args_truncated",
            Weight::Function,
            |exec, _, _| exec.args_truncated,
            |exec, value| exec.args_truncated = value,
        ),
        Field::strings(
            "envs",
            "envs",
            Weight::Handler,
            |exec, resolvers, store| {
                exec.envs
                    .get_or_resolve(store, || resolvers.resolve_exec_envs(exec))
            },
            |exec, value| exec.envs.set(value),
        ),
        Field::boolean(
            "envs_truncated",
            "envs_truncated",
            Weight::Function,
            |exec, _, _| exec.envs_truncated,
            |exec, value| exec.envs_truncated = value,
        ),
    ]
}

fn chmod_fields() -> Vec<Field<ChmodEvent>> {
    vec![Field::int(
        "file.destination.mode",
        "mode",
        Weight::Function,
        |chmod, _, _| chmod.mode.into(),
        |chmod, value| {
            chmod.mode = narrow(value)?;
            Ok(())
        },
    )]
}

fn chown_fields() -> Vec<Field<ChownEvent>> {
    vec![
        Field::int(
            "file.destination.gid",
            "gid",
            Weight::Function,
            |chown, _, _| chown.gid.into(),
            |chown, value| {
                chown.gid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "file.destination.group",
            "group",
            Weight::Handler,
            |chown, resolvers, store| {
                chown.group.get_or_resolve(store, || {
                    u32::try_from(chown.gid)
                        .map(|gid| resolvers.resolve_group(gid))
                        .unwrap_or_default()
                })
            },
            |chown, value| chown.group.set(value),
        ),
        Field::int(
            "file.destination.uid",
            "uid",
            Weight::Function,
            |chown, _, _| chown.uid.into(),
            |chown, value| {
                chown.uid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "file.destination.user",
            "user",
            Weight::Handler,
            |chown, resolvers, store| {
                chown.user.get_or_resolve(store, || {
                    u32::try_from(chown.uid)
                        .map(|uid| resolvers.resolve_user(uid))
                        .unwrap_or_default()
                })
            },
            |chown, value| chown.user.set(value),
        ),
    ]
}

fn mkdir_fields() -> Vec<Field<MkdirEvent>> {
    vec![Field::int(
        "file.destination.mode",
        "mode",
        Weight::Function,
        |mkdir, _, _| mkdir.mode.into(),
        |mkdir, value| {
            mkdir.mode = narrow(value)?;
            Ok(())
        },
    )]
}

fn open_fields() -> Vec<Field<OpenEvent>> {
    vec![
        Field::int(
            "file.destination.mode",
            "mode",
            Weight::Function,
            |open, _, _| open.mode.into(),
            |open, value| {
                open.mode = narrow(value)?;
                Ok(())
            },
        ),
        Field::int(
            "flags",
            "flags",
            Weight::Function,
            |open, _, _| open.flags.into(),
            |open, value| {
                open.flags = narrow(value)?;
                Ok(())
            },
        ),
    ]
}

fn xattr_fields() -> Vec<Field<XAttrEvent>> {
    vec![
        Field::string(
            "file.destination.name",
            "name",
            Weight::Handler,
            |xattr, _, store| xattr.name.get_or_resolve(store, || xattr.decode_name()),
            |xattr, value| xattr.name.set(value),
        ),
        Field::string(
            "file.destination.namespace",
            "namespace",
            Weight::Handler,
            |xattr, _, store| {
                xattr
                    .namespace
                    .get_or_resolve(store, || xattr.decode_namespace())
            },
            |xattr, value| xattr.namespace.set(value),
        ),
    ]
}

fn setuid_fields() -> Vec<Field<SetUidEvent>> {
    vec![
        Field::int(
            "euid",
            "euid",
            Weight::Function,
            |setuid, _, _| setuid.euid.into(),
            |setuid, value| {
                setuid.euid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "euser",
            "euser",
            Weight::Handler,
            |setuid, resolvers, store| {
                setuid
                    .euser
                    .get_or_resolve(store, || resolvers.resolve_user(setuid.euid))
            },
            |setuid, value| setuid.euser.set(value),
        ),
        Field::int(
            "fsuid",
            "fsuid",
            Weight::Function,
            |setuid, _, _| setuid.fsuid.into(),
            |setuid, value| {
                setuid.fsuid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "fsuser",
            "fsuser",
            Weight::Handler,
            |setuid, resolvers, store| {
                setuid
                    .fsuser
                    .get_or_resolve(store, || resolvers.resolve_user(setuid.fsuid))
            },
            |setuid, value| setuid.fsuser.set(value),
        ),
        Field::int(
            "uid",
            "uid",
            Weight::Function,
            |setuid, _, _| setuid.uid.into(),
            |setuid, value| {
                setuid.uid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "user",
            "user",
            Weight::Handler,
            |setuid, resolvers, store| {
                setuid
                    .user
                    .get_or_resolve(store, || resolvers.resolve_user(setuid.uid))
            },
            |setuid, value| setuid.user.set(value),
        ),
    ]
}

fn setgid_fields() -> Vec<Field<SetGidEvent>> {
    vec![
        Field::int(
            "egid",
            "egid",
            Weight::Function,
            |setgid, _, _| setgid.egid.into(),
            |setgid, value| {
                setgid.egid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "egroup",
            "egroup",
            Weight::Handler,
            |setgid, resolvers, store| {
                setgid
                    .egroup
                    .get_or_resolve(store, || resolvers.resolve_group(setgid.egid))
            },
            |setgid, value| setgid.egroup.set(value),
        ),
        Field::int(
            "fsgid",
            "fsgid",
            Weight::Function,
            |setgid, _, _| setgid.fsgid.into(),
            |setgid, value| {
                setgid.fsgid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "fsgroup",
            "fsgroup",
            Weight::Handler,
            |setgid, resolvers, store| {
                setgid
                    .fsgroup
                    .get_or_resolve(store, || resolvers.resolve_group(setgid.fsgid))
            },
            |setgid, value| setgid.fsgroup.set(value),
        ),
        Field::int(
            "gid",
            "gid",
            Weight::Function,
            |setgid, _, _| setgid.gid.into(),
            |setgid, value| {
                setgid.gid = narrow(value)?;
                Ok(())
            },
        ),
        Field::string(
            "group",
            "group",
            Weight::Handler,
            |setgid, resolvers, store| {
                setgid
                    .group
                    .get_or_resolve(store, || resolvers.resolve_group(setgid.gid))
            },
            |setgid, value| setgid.group.set(value),
        ),
    ]
}

fn capset_fields() -> Vec<Field<CapsetEvent>> {
    vec![
        Field::int(
            "cap_effective",
            "cap_effective",
            Weight::Function,
            |capset, _, _| capset.cap_effective as i64,
            |capset, value| {
                capset.cap_effective = value as u64;
                Ok(())
            },
        ),
        Field::int(
            "cap_permitted",
            "cap_permitted",
            Weight::Function,
            |capset, _, _| capset.cap_permitted as i64,
            |capset, value| {
                capset.cap_permitted = value as u64;
                Ok(())
            },
        ),
    ]
}
