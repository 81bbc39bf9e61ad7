use proc_macro::TokenStream;

/// Splits the macro input into its comma separated, unquoted arguments.
fn arguments(input: TokenStream) -> Vec<String> {
    input
        .to_string()
        .split(',')
        .map(|s| s.trim().replace('"', ""))
        .filter(|s| !s.is_empty())
        .collect()
}

fn headline(name: &str) -> String {
    let mut name_chars = name.chars();
    match name_chars.next() {
        Some(c) => format!("{}{}", c.to_uppercase(), name_chars.collect::<String>()),
        None => String::new(),
    }
}

/// Generates a getter, setter, filler and remover for an optional text field of a record.
///
/// ```ignore
/// text_field_accessor!(AudioMetadata, "album");
/// ```
#[proc_macro]
pub fn text_field_accessor(input: TokenStream) -> TokenStream {
    let args = arguments(input);
    let record = args.first().expect("Expected record type");
    let field = args.get(1).expect("Expected field ident");
    let name = field.replace('_', " ");

    format!(
        "
/// ### {0}
impl {1} {{
    /// Returns the {2}.
    pub fn {3}(&self) -> Option<&str> {{
        self.{3}.as_deref()
    }}

    /// Sets the {2}. The value is trimmed, a blank value unsets the {2}.
    pub fn set_{3}(&mut self, {3}: impl AsRef<str>) {{
        self.{3} = crate::record::normalize({3}.as_ref());
    }}

    /// Sets the {2} if it isn't set yet.
    pub fn fill_{3}(&mut self, {3}: impl AsRef<str>) {{
        if self.{3}.is_none() {{
            self.set_{3}({3});
        }}
    }}

    /// Removes the {2}.
    pub fn remove_{3}(&mut self) {{
        self.{3} = None;
    }}
}}
    ",
        headline(&name),
        record,
        name,
        field,
    )
    .parse()
    .expect("Generated text accessor is not valid rust")
}

fn number_accessor(input: TokenStream, one_based: bool) -> TokenStream {
    let args = arguments(input);
    let record = args.first().expect("Expected record type");
    let field = args.get(1).expect("Expected field ident");
    let ty = args.get(2).expect("Expected number type");
    let name = field.replace('_', " ");

    let (set_doc, value) = match one_based {
        true => (
            format!("Sets the {name}. Numbering starts at 1, zero unsets the {name}."),
            format!("Some({field}).filter(|&n| n != 0)"),
        ),
        false => (format!("Sets the {name}."), format!("Some({field})")),
    };

    format!(
        "
/// ### {0}
impl {1} {{
    /// Returns the {2}.
    pub fn {3}(&self) -> Option<{4}> {{
        self.{3}
    }}

    /// {5}
    pub fn set_{3}(&mut self, {3}: {4}) {{
        self.{3} = {6};
    }}

    /// Sets the {2} if it isn't set yet.
    pub fn fill_{3}(&mut self, {3}: {4}) {{
        if self.{3}.is_none() {{
            self.set_{3}({3});
        }}
    }}

    /// Removes the {2}.
    pub fn remove_{3}(&mut self) {{
        self.{3} = None;
    }}
}}
    ",
        headline(&name),
        record,
        name,
        field,
        ty,
        set_doc,
        value,
    )
    .parse()
    .expect("Generated number accessor is not valid rust")
}

/// Generates a getter, setter, filler and remover for an optional numeric field of a record.
///
/// ```ignore
/// number_field_accessor!(AudioMetadata, "bitrate", u32);
/// ```
#[proc_macro]
pub fn number_field_accessor(input: TokenStream) -> TokenStream {
    number_accessor(input, false)
}

/// Like [`number_field_accessor!`] for positions counted from 1, like track and disk numbers.
/// Setting zero leaves the field unset.
///
/// ```ignore
/// ordinal_field_accessor!(AudioMetadata, "track", u16);
/// ```
#[proc_macro]
pub fn ordinal_field_accessor(input: TokenStream) -> TokenStream {
    number_accessor(input, true)
}
