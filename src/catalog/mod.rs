//! Static tables describing the Omni language and its standard library.
//!
//! Everything the editor knows about built-ins lives here: keywords,
//! global functions, and the built-in classes with their members. The
//! tables mirror what the Omni runtime registers.

mod docs;

pub use docs::long_doc;

/// What a built-in member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Function,
    Constant,
}

/// A callable or constant: a global function or a built-in class member.
#[derive(Debug, PartialEq)]
pub struct Member {
    pub name: &'static str,
    /// Call form shown to the user, e.g. `substring(s, start, [end])`.
    /// For constants, a short description of the value.
    pub signature: &'static str,
    pub summary: &'static str,
    pub kind: MemberKind,
}

const fn func(name: &'static str, signature: &'static str, summary: &'static str) -> Member {
    Member {
        name,
        signature,
        summary,
        kind: MemberKind::Function,
    }
}

const fn constant(name: &'static str, signature: &'static str, summary: &'static str) -> Member {
    Member {
        name,
        signature,
        summary,
        kind: MemberKind::Constant,
    }
}

/// A built-in class (static namespace) such as `Math` or `String`.
#[derive(Debug, PartialEq)]
pub struct BuiltinClass {
    pub name: &'static str,
    pub summary: &'static str,
    pub members: &'static [Member],
}

#[derive(Debug, PartialEq)]
pub struct KeywordEntry {
    pub name: &'static str,
    pub summary: &'static str,
}

const fn kw(name: &'static str, summary: &'static str) -> KeywordEntry {
    KeywordEntry { name, summary }
}

pub static KEYWORDS: &[KeywordEntry] = &[
    kw("def", "Define a function"),
    kw("class", "Define a class"),
    kw("interface", "Define an interface"),
    kw("extends", "Inherit from a parent class"),
    kw("implements", "Declare implemented interfaces"),
    kw("if", "Conditional statement"),
    kw("elif", "Else-if statement"),
    kw("else", "Else statement"),
    kw("while", "While loop"),
    kw("for", "For loop"),
    kw("in", "Iteration target in a for loop"),
    kw("return", "Return value"),
    kw("break", "Break loop"),
    kw("continue", "Continue loop"),
    kw("try", "Try block"),
    kw("catch", "Catch block"),
    kw("finally", "Finally block"),
    kw("throw", "Throw exception"),
    kw("import", "Import module"),
    kw("as", "Alias an import"),
    kw("var", "Variable declaration (optional)"),
    kw("new", "Instantiate class"),
    kw("this", "Current instance"),
    kw("self", "Current instance (alias)"),
    kw("public", "Public member"),
    kw("private", "Private member"),
    kw("protected", "Protected member"),
    kw("static", "Static member"),
    kw("true", "Boolean true"),
    kw("false", "Boolean false"),
    kw("null", "Absence of a value"),
    kw("long", "64-bit integer type"),
    kw("double", "Double-precision floating point type"),
    kw("bool", "Boolean type"),
    kw("char", "Character type"),
    kw("void", "No return value"),
];

pub static FUNCTIONS: &[Member] = &[
    func("print", "print(...args)", "Print to console"),
    func("println", "println(...args)", "Print to console (alias of print)"),
    func("printf", "printf(fmt, ...args)", "Formatted print"),
    func("input", "input(prompt)", "Read input from console"),
    func("typeof", "typeof(value)", "Get value type"),
    func("len", "len(obj)", "Get length/size"),
    func("range", "range(start, end, step)", "Create a range of numbers"),
    func("str", "str(value)", "Convert to string"),
    func("int", "int(value)", "Convert to integer"),
    func("float", "float(value)", "Convert to floating point"),
];

static MATH: &[Member] = &[
    func("abs", "abs(x)", "Absolute value"),
    func("max", "max(a, b)", "Maximum value"),
    func("min", "min(a, b)", "Minimum value"),
    func("sqrt", "sqrt(x)", "Square root"),
    func("pow", "pow(base, exp)", "Power"),
    func("floor", "floor(x)", "Round down"),
    func("ceil", "ceil(x)", "Round up"),
    func("round", "round(x)", "Round to nearest integer"),
    func("random", "random()", "Random number 0.0-1.0"),
    func("sin", "sin(x)", "Sine function"),
    func("cos", "cos(x)", "Cosine function"),
    func("tan", "tan(x)", "Tangent function"),
    func("log", "log(x)", "Natural logarithm"),
    func("log10", "log10(x)", "Base-10 logarithm"),
    func("exp", "exp(x)", "Exponential e^x"),
    constant("PI", "Constant PI", "3.14159..."),
    constant("E", "Constant E", "2.718..."),
];

static STRING: &[Member] = &[
    func("length", "length(s)", "Get string length"),
    func("toUpperCase", "toUpperCase(s)", "Convert to uppercase"),
    func("toLowerCase", "toLowerCase(s)", "Convert to lowercase"),
    func("substring", "substring(s, start, [end])", "Get substring"),
    func("indexOf", "indexOf(s, sub)", "Find substring index"),
    func("contains", "contains(s, sub)", "Check if contains substring"),
    func("startsWith", "startsWith(s, prefix)", "Check prefix"),
    func("endsWith", "endsWith(s, suffix)", "Check suffix"),
    func("replace", "replace(s, old, new)", "Replace all occurrences"),
    func("trim", "trim(s)", "Remove whitespace"),
    func("split", "split(s, delim)", "Split string"),
    func("charAt", "charAt(s, index)", "Get character at index"),
    func("format", "format(fmt, ...args)", "Format string"),
    func("isEmpty", "isEmpty(s)", "Check if empty"),
    func("equals", "equals(s1, s2)", "Check equality"),
    func("equalsIgnoreCase", "equalsIgnoreCase(s1, s2)", "Check case-insensitive equality"),
];

static FILE: &[Member] = &[
    func("read", "read(path)", "Read file content"),
    func("write", "write(path, content)", "Write content to file"),
    func("append", "append(path, content)", "Append content to file"),
    func("exists", "exists(path)", "Check if file exists"),
];

static LIST: &[Member] = &[
    func("new", "new()", "Create new list"),
    func("add", "add(list, item)", "Add item to list"),
    func("get", "get(list, index)", "Get item at index"),
    func("set", "set(list, index, val)", "Set item at index"),
    func("remove", "remove(list, index)", "Remove item at index"),
    func("size", "size(list)", "Get list size"),
    func("isEmpty", "isEmpty(list)", "Check if list is empty"),
    func("contains", "contains(list, item)", "Check if item exists"),
    func("indexOf", "indexOf(list, item)", "Find item index"),
];

static MAP: &[Member] = &[
    func("new", "new()", "Create new map"),
    func("put", "put(map, key, val)", "Put key-value"),
    func("get", "get(map, key)", "Get value"),
    func("containsKey", "containsKey(map, key)", "Check key existence"),
    func("keys", "keys(map)", "Get all keys"),
    func("size", "size(map)", "Get map size"),
];

static DATE: &[Member] = &[
    func("now", "now()", "Current timestamp"),
    func("format", "format(ts, [fmt])", "Format timestamp"),
    func("parse", "parse(str, [fmt])", "Parse date string"),
    func("year", "year(ts)", "Get year"),
    func("month", "month(ts)", "Get month"),
    func("day", "day(ts)", "Get day"),
    func("before", "before(ts1, ts2)", "Check order"),
    func("after", "after(ts1, ts2)", "Check order"),
];

static SERIALIZER: &[Member] = &[
    func("saveJSON", "saveJSON(path, data)", "Save to JSON file"),
    func("loadJSON", "loadJSON(path)", "Load from JSON file"),
    func("toJSON", "toJSON(data)", "Convert to JSON string"),
    func("fromJSON", "fromJSON(str)", "Parse JSON string"),
    func("saveBinary", "saveBinary(path, data)", "Save to binary file"),
    func("loadBinary", "loadBinary(path)", "Load from binary file"),
];

static REGEX: &[Member] = &[
    func("matches", "matches(str, pat)", "Full match check"),
    func("search", "search(str, pat)", "Partial match check"),
    func("find", "find(str, pat)", "Find match position"),
    func("findAll", "findAll(str, pat)", "Find all matches"),
    func("replace", "replace(str, pat, rep)", "Replace matches"),
    func("split", "split(str, pat)", "Split by regex"),
    func("groups", "groups(str, pat)", "Extract capture groups"),
];

static CSV: &[Member] = &[
    func("readFile", "readFile(path)", "Read CSV file"),
    func("parse", "parse(content)", "Parse CSV string"),
];

static PATH: &[Member] = &[
    func("join", "join(...parts)", "Join path segments"),
    func("dirname", "dirname(path)", "Directory part of a path"),
    func("basename", "basename(path)", "Final component of a path"),
    func("extension", "extension(path)", "Extension including the dot"),
];

static SYSTEM: &[Member] = &[
    func("exit", "exit([code])", "Terminate the program"),
    func("getenv", "getenv(name)", "Read an environment variable"),
    func("sleep", "sleep(ms)", "Pause for milliseconds"),
];

static INTEGER: &[Member] = &[func("parseInt", "parseInt(s)", "Parse an integer")];

static DOUBLE: &[Member] = &[func("parseDouble", "parseDouble(s)", "Parse a floating point number")];

pub static CLASSES: &[BuiltinClass] = &[
    BuiltinClass { name: "Math", summary: "Mathematical functions and constants", members: MATH },
    BuiltinClass { name: "String", summary: "String utility functions", members: STRING },
    BuiltinClass { name: "File", summary: "File I/O operations", members: FILE },
    BuiltinClass { name: "List", summary: "List (Array) utility functions", members: LIST },
    BuiltinClass { name: "Map", summary: "Map (Dictionary) utility functions", members: MAP },
    BuiltinClass { name: "Date", summary: "Date and Time functions", members: DATE },
    BuiltinClass { name: "Serializer", summary: "JSON and Binary serialization", members: SERIALIZER },
    BuiltinClass { name: "Regex", summary: "Regular expression functions", members: REGEX },
    BuiltinClass { name: "CSV", summary: "CSV parsing and reading functions", members: CSV },
    BuiltinClass { name: "Path", summary: "File path utilities", members: PATH },
    BuiltinClass { name: "System", summary: "System utilities (exit, env, time)", members: SYSTEM },
    BuiltinClass { name: "Integer", summary: "Integer parsing", members: INTEGER },
    BuiltinClass { name: "Double", summary: "Floating point parsing", members: DOUBLE },
];

pub fn keyword(name: &str) -> Option<&'static KeywordEntry> {
    KEYWORDS.iter().find(|k| k.name == name)
}

pub fn function(name: &str) -> Option<&'static Member> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

pub fn class(name: &str) -> Option<&'static BuiltinClass> {
    CLASSES.iter().find(|c| c.name == name)
}

pub fn member(class_name: &str, name: &str) -> Option<&'static Member> {
    class(class_name)?.members.iter().find(|m| m.name == name)
}

/// Resolve `name` or `Class.member` to a callable/constant entry.
pub fn lookup(qualified: &str) -> Option<&'static Member> {
    match qualified.split_once('.') {
        Some((class_name, name)) => member(class_name, name),
        None => function(qualified),
    }
}

/// Parameter labels between the parentheses of a signature.
pub fn parameters(signature: &str) -> Vec<&str> {
    let (Some(open), Some(close)) = (signature.find('('), signature.rfind(')')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    signature[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Markdown hover text for a keyword, built-in function, built-in class,
/// or `Class.member`.
pub fn hover_doc(qualified: &str) -> Option<String> {
    if let Some(doc) = long_doc(qualified) {
        return Some(doc.to_string());
    }

    if let Some((class_name, name)) = qualified.split_once('.') {
        let m = member(class_name, name)?;
        return Some(match m.kind {
            MemberKind::Function => format!("**{class_name}.{}**\n\n{}", m.signature, m.summary),
            MemberKind::Constant => format!("**{class_name}.{}**\n\n{}: {}", m.name, m.signature, m.summary),
        });
    }

    if let Some(f) = function(qualified) {
        return Some(format!("**{}**\n\n{}", f.signature, f.summary));
    }

    if let Some(c) = class(qualified) {
        let names: Vec<&str> = c.members.iter().map(|m| m.name).collect();
        return Some(format!(
            "**{}**\n\n{}\n\nMembers: `{}`",
            c.name,
            c.summary,
            names.join("`, `")
        ));
    }

    keyword(qualified).map(|k| format!("**{}**\n\n{}", k.name, k.summary))
}
