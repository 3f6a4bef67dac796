//! Hand-written long-form documentation for the most used built-ins.
//!
//! Entries not listed here get a generated one-liner from the tables in
//! the parent module.

pub fn long_doc(name: &str) -> Option<&'static str> {
    let doc = match name {
        "def" => {
            "**def**\n\
             Define a new function.\n\n\
             ```omni\n\
             def add(a, b):\n    return a + b\n\
             ```"
        }
        "class" => {
            "**class**\n\
             Define a new class. A parent class goes in parentheses or after `extends`.\n\n\
             ```omni\n\
             class Person:\n    def __init__(self, name):\n        self.name = name\n\
             ```"
        }
        "if" => {
            "**if statement**\n\
             Run a block when the condition holds.\n\n\
             ```omni\n\
             if x > 0:\n    print(\"Positive\")\n\
             elif x < 0:\n    print(\"Negative\")\n\
             else:\n    print(\"Zero\")\n\
             ```"
        }
        "while" => {
            "**while loop**\n\
             Repeat a block while the condition holds.\n\n\
             ```omni\n\
             while x > 0:\n    print(x)\n    x = x - 1\n\
             ```"
        }
        "for" => {
            "**for loop**\n\
             Iterate over a sequence or range.\n\n\
             ```omni\n\
             for i in range(10):\n    print(i)\n\
             ```"
        }
        "return" => "**return**\nExit the function, optionally with a value.",
        "print" => {
            "**print(...args)**\n\
             Print values to standard output, followed by a newline.\n\n\
             **Parameters:**\n\
             * `...args`: Values to print (converted to string).\n\n\
             **Example:**\n\
             ```omni\n\
             print(\"Hello\", \"World\", 123)\n\
             ```"
        }
        "input" => {
            "**input(prompt)**\n\
             Read a line of text from standard input.\n\n\
             **Parameters:**\n\
             * `prompt` (String): Text shown before waiting for input.\n\n\
             **Returns:**\n\
             * `String`: The line entered."
        }
        "Math.sqrt" => {
            "**Math.sqrt(x)**\n\
             Square root of a number.\n\n\
             **Parameters:**\n\
             * `x` (Number): Must be non-negative.\n\n\
             **Returns:**\n\
             * `Float`: Square root of x.\n\n\
             **Example:**\n\
             ```omni\n\
             Math.sqrt(16) // 4.0\n\
             ```"
        }
        "Math.pow" => {
            "**Math.pow(base, exp)**\n\
             Raise `base` to the power `exp`.\n\n\
             **Parameters:**\n\
             * `base` (Number): The base.\n\
             * `exp` (Number): The exponent.\n\n\
             **Returns:**\n\
             * `Float`: base^exp."
        }
        "Math.random" => {
            "**Math.random()**\n\
             Pseudo-random number in [0.0, 1.0).\n\n\
             **Returns:**\n\
             * `Float`: Random value."
        }
        "String.length" => {
            "**String.length(s)**\n\
             Number of characters in the string.\n\n\
             **Parameters:**\n\
             * `s` (String): The input string.\n\n\
             **Returns:**\n\
             * `Integer`: Character count."
        }
        "String.substring" => {
            "**String.substring(s, start, [end])**\n\
             Extract part of a string.\n\n\
             **Parameters:**\n\
             * `s` (String): Input string.\n\
             * `start` (Integer): Start index (inclusive).\n\
             * `end` (Integer): End index (exclusive). Optional.\n\n\
             **Returns:**\n\
             * `String`: The substring."
        }
        "String.split" => {
            "**String.split(s, delim)**\n\
             Split a string on a delimiter.\n\n\
             **Parameters:**\n\
             * `s` (String): Input string.\n\
             * `delim` (String): Separator.\n\n\
             **Returns:**\n\
             * `List<String>`: The pieces."
        }
        "File.read" => {
            "**File.read(path)**\n\
             Read a whole file as a string.\n\n\
             **Parameters:**\n\
             * `path` (String): Path to the file.\n\n\
             **Returns:**\n\
             * `String`: File content. Throws if the file is missing."
        }
        "File.write" => {
            "**File.write(path, content)**\n\
             Write a string to a file, replacing any existing content.\n\n\
             **Parameters:**\n\
             * `path` (String): Path to the file.\n\
             * `content` (String): Text to write."
        }
        "CSV.parse" => {
            "**CSV.parse(content)**\n\
             Parse CSV text into a list of rows.\n\n\
             **Parameters:**\n\
             * `content` (String): Raw CSV text.\n\n\
             **Returns:**\n\
             * `List<List<String>>`: Rows and columns.\n\n\
             **Example:**\n\
             ```omni\n\
             rows = CSV.parse(\"name,age\\nAlice,30\")\n\
             print(rows[1][0]) // \"Alice\"\n\
             ```"
        }
        "Regex.matches" => {
            "**Regex.matches(str, pat)**\n\
             Whether the whole string matches the pattern.\n\n\
             **Parameters:**\n\
             * `str` (String): Input string.\n\
             * `pat` (String): Regex pattern.\n\n\
             **Returns:**\n\
             * `Boolean`: True on a full match."
        }
        "Path.join" => {
            "**Path.join(...parts)**\n\
             Join path segments with `/`, without doubling separators.\n\n\
             **Parameters:**\n\
             * `...parts` (String): Path segments.\n\n\
             **Returns:**\n\
             * `String`: Joined path."
        }
        _ => return None,
    };
    Some(doc)
}
