//! Declarative GraphQL schema
//!
//! Each object type is an explicit field allowlist. The executor validates
//! selections against these definitions and the SDL endpoint renders them.

/// Type of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(&'static str),
    Enum(&'static str),
    Object(&'static str),
    List(&'static str),
}

impl FieldType {
    /// Whether the field requires a selection of subfields
    pub fn is_composite(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::List(_))
    }

    fn sdl(&self) -> String {
        match self {
            FieldType::Scalar(name) | FieldType::Enum(name) | FieldType::Object(name) => {
                name.to_string()
            }
            FieldType::List(name) => format!("[{}]", name),
        }
    }
}

#[derive(Debug)]
pub struct ArgumentDef {
    pub name: &'static str,
    /// Alternative spellings accepted on input
    pub aliases: &'static [&'static str],
    pub graphql_type: &'static str,
    pub default: Option<&'static str>,
}

impl ArgumentDef {
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub non_null: bool,
    pub arguments: &'static [ArgumentDef],
}

impl FieldDef {
    pub fn argument(&self, name: &str) -> Option<&'static ArgumentDef> {
        self.arguments.iter().find(|arg| arg.matches(name))
    }
}

#[derive(Debug)]
pub struct ObjectDef {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldDef],
}

impl ObjectDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug)]
pub struct EnumDef {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

const fn field(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef {
        name,
        ty,
        non_null: false,
        arguments: &[],
    }
}

const fn required(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef {
        name,
        ty,
        non_null: true,
        arguments: &[],
    }
}

const STRING: FieldType = FieldType::Scalar("String");
const INT: FieldType = FieldType::Scalar("Int");
const BOOLEAN: FieldType = FieldType::Scalar("Boolean");
const DATE: FieldType = FieldType::Scalar("Date");

/// `includeDisabled` / `includeSystem` scope flags
pub const SCOPE_ARGUMENTS: &[ArgumentDef] = &[
    ArgumentDef {
        name: "includeDisabled",
        aliases: &["include_disabled"],
        graphql_type: "Boolean",
        default: Some("false"),
    },
    ArgumentDef {
        name: "includeSystem",
        aliases: &["include_system"],
        graphql_type: "Boolean",
        default: Some("false"),
    },
];

pub const TAG: ObjectDef = ObjectDef {
    name: "Tag",
    description: "A group of resources within a project, used for prioritization",
    fields: &[
        required("slug", STRING),
        required("name", STRING),
        field("priority", INT),
    ],
};

pub const PROJECT_LOCALE: ObjectDef = ObjectDef {
    name: "ProjectLocale",
    description: "A project translated into one locale",
    fields: &[
        required("project", FieldType::Object("Project")),
        required("locale", FieldType::Object("Locale")),
        required("totalStrings", INT),
        required("approvedStrings", INT),
        required("fuzzyStrings", INT),
        required("stringsWithErrors", INT),
        required("stringsWithWarnings", INT),
        required("unreviewedStrings", INT),
        field("missingStrings", INT),
        field("complete", BOOLEAN),
    ],
};

pub const PROJECT: ObjectDef = ObjectDef {
    name: "Project",
    description: "A localizable product",
    fields: &[
        required("name", STRING),
        required("slug", STRING),
        required("disabled", BOOLEAN),
        required("syncDisabled", BOOLEAN),
        required("pretranslationEnabled", BOOLEAN),
        required("visibility", STRING),
        required("systemProject", BOOLEAN),
        required("info", STRING),
        field("deadline", DATE),
        required("priority", INT),
        field("contact", STRING),
        required("totalStrings", INT),
        required("approvedStrings", INT),
        required("fuzzyStrings", INT),
        required("stringsWithErrors", INT),
        required("stringsWithWarnings", INT),
        required("unreviewedStrings", INT),
        field("missingStrings", INT),
        field("complete", BOOLEAN),
        field("localizations", FieldType::List("ProjectLocale")),
        field("tags", FieldType::List("Tag")),
    ],
};

pub const LOCALE: ObjectDef = ObjectDef {
    name: "Locale",
    description: "A language, possibly regional, that projects are translated into",
    fields: &[
        required("name", STRING),
        required("code", STRING),
        required("direction", FieldType::Enum("LocaleDirection")),
        required("cldrPlurals", STRING),
        required("pluralRule", STRING),
        required("script", STRING),
        required("population", INT),
        required("totalStrings", INT),
        required("approvedStrings", INT),
        required("fuzzyStrings", INT),
        required("stringsWithErrors", INT),
        required("stringsWithWarnings", INT),
        required("unreviewedStrings", INT),
        field("missingStrings", INT),
        field("complete", BOOLEAN),
        required("googleTranslateCode", STRING),
        required("msTranslatorCode", STRING),
        required("systranTranslateCode", STRING),
        required("msTerminologyCode", STRING),
        FieldDef {
            name: "localizations",
            ty: FieldType::List("ProjectLocale"),
            non_null: false,
            arguments: SCOPE_ARGUMENTS,
        },
    ],
};

pub const DEBUG_INFO: ObjectDef = ObjectDef {
    name: "DebugInfo",
    description: "Diagnostics about the current request",
    fields: &[field("storeCalls", FieldType::List("StoreCall"))],
};

pub const STORE_CALL: ObjectDef = ObjectDef {
    name: "StoreCall",
    description: "One call made to the catalog store",
    fields: &[
        required("operation", STRING),
        required("detail", STRING),
    ],
};

pub const QUERY: ObjectDef = ObjectDef {
    name: "Query",
    description: "Read-only entry points",
    fields: &[
        FieldDef {
            name: "projects",
            ty: FieldType::List("Project"),
            non_null: false,
            arguments: SCOPE_ARGUMENTS,
        },
        FieldDef {
            name: "project",
            ty: FieldType::Object("Project"),
            non_null: false,
            arguments: &[ArgumentDef {
                name: "slug",
                aliases: &[],
                graphql_type: "String",
                default: None,
            }],
        },
        field("locales", FieldType::List("Locale")),
        FieldDef {
            name: "locale",
            ty: FieldType::Object("Locale"),
            non_null: false,
            arguments: &[ArgumentDef {
                name: "code",
                aliases: &[],
                graphql_type: "String",
                default: None,
            }],
        },
    ],
};

/// Root field only present when `graphql.debug` is enabled
pub const DEBUG_FIELD: FieldDef = field("__debug", FieldType::Object("DebugInfo"));

pub const LOCALE_DIRECTION: EnumDef = EnumDef {
    name: "LocaleDirection",
    values: &["LTR", "RTL"],
};

const OBJECTS: &[&ObjectDef] = &[
    &QUERY,
    &PROJECT,
    &LOCALE,
    &PROJECT_LOCALE,
    &TAG,
    &DEBUG_INFO,
    &STORE_CALL,
];

/// Look up an object type by name
pub fn object(name: &str) -> Option<&'static ObjectDef> {
    OBJECTS.iter().copied().find(|object| object.name == name)
}

/// Render the schema as SDL
pub fn generate_sdl(include_debug: bool) -> String {
    let mut sdl = String::new();

    sdl.push_str("scalar Date\n\n");

    sdl.push_str(&format!("enum {} {{\n", LOCALE_DIRECTION.name));
    for value in LOCALE_DIRECTION.values {
        sdl.push_str(&format!("  {}\n", value));
    }
    sdl.push_str("}\n\n");

    for object in OBJECTS {
        let debug_only = matches!(object.name, "DebugInfo" | "StoreCall");
        if debug_only && !include_debug {
            continue;
        }

        sdl.push_str(&format!("\"\"\"{}\"\"\"\n", object.description));
        sdl.push_str(&format!("type {} {{\n", object.name));
        for field in object.fields {
            sdl.push_str(&render_field(field));
        }
        if object.name == QUERY.name && include_debug {
            sdl.push_str(&render_field(&DEBUG_FIELD));
        }
        sdl.push_str("}\n\n");
    }

    sdl.push_str("schema {\n");
    sdl.push_str("  query: Query\n");
    sdl.push_str("}\n");

    sdl
}

fn render_field(field: &FieldDef) -> String {
    let arguments = if field.arguments.is_empty() {
        String::new()
    } else {
        let rendered: Vec<String> = field
            .arguments
            .iter()
            .map(|arg| match arg.default {
                Some(default) => format!("{}: {} = {}", arg.name, arg.graphql_type, default),
                None => format!("{}: {}", arg.name, arg.graphql_type),
            })
            .collect();
        format!("({})", rendered.join(", "))
    };

    let bang = if field.non_null { "!" } else { "" };
    format!("  {}{}: {}{}\n", field.name, arguments, field.ty.sdl(), bang)
}
