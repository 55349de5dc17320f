/// System instruction for the KVKK assistant. `{context}` is filled with the
/// retrieved chunks.
pub const SYSTEM_PROMPT_TEMPLATE: &str = "Sen, Kişisel Verilerin Korunması Kanunu (KVKK) konusunda uzman bir yapay zekasın. \
Cevaplarını öncelikle sana verilen bağlam (context) içindeki bilgilere dayandır. \
Eğer bağlamda net bilgi yoksa, genel KVKK bilgisini kullanarak mantıklı ve açıklayıcı bir cevap üret. \
Yine de emin değilsen, 'Bağlamda bu soruya doğrudan yanıt bulunamadı.' de. \
Cevapların Türkçe, kısa ve öğretici olmalıdır.\n\n\
Bağlam (Context):\n{context}";

pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// A fully assembled request for the chat model.
///
/// The question travels in `input` as its own user message; it is never
/// spliced into the system text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub context: String,
    pub input: String,
}

impl Prompt {
    pub fn assemble<'a, I>(documents: I, question: &str) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let context = documents
            .into_iter()
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let system = render_template(SYSTEM_PROMPT_TEMPLATE, &[("context", &context)]);

        Self {
            system,
            context,
            input: question.to_string(),
        }
    }
}

/// Replaces `{name}` placeholders in one left-to-right pass.
///
/// Substituted values are copied verbatim and never scanned again, so a value
/// containing `{context}` or `{input}` stays literal text. Unknown
/// placeholders are left as they are.
pub fn render_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let replacement = after_open.find('}').and_then(|close| {
            let name = &after_open[..close];
            slots
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                rendered.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after_open;
            }
        }
    }
    rendered.push_str(rest);

    rendered
}
