use guildhall_core::errors::InterfaceError;

/// Platform cap on buttons in one action row.
pub const BUTTONS_PER_ROW: usize = 5;
pub const OPTION_LABEL_MAX: usize = 100;
pub const FIELD_VALUE_MAX: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Blue,
    Green,
    Red,
    Orange,
    Gold,
    Custom(u32),
}

impl Color {
    pub fn value(self) -> u32 {
        match self {
            Self::Blue => 0x3498db,
            Self::Green => 0x2ecc71,
            Self::Red => 0xe74c3c,
            Self::Orange => 0xe67e22,
            Self::Gold => 0xf1c40f,
            Self::Custom(value) => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: Color,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub emoji: Option<String>,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            emoji: None,
            style: ButtonStyle::Secondary,
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

impl SelectOption {
    pub fn new(label: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            label: clip(label.as_ref(), OPTION_LABEL_MAX),
            value: value.into(),
            description: None,
            emoji: None,
        }
    }

    pub fn description(mut self, description: impl AsRef<str>) -> Self {
        self.description = Some(clip(description.as_ref(), OPTION_LABEL_MAX));
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
    pub min_values: usize,
    pub max_values: usize,
}

impl SelectMenu {
    /// Single-choice menu.
    pub fn new(custom_id: impl Into<String>, placeholder: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self { custom_id: custom_id.into(), placeholder: placeholder.into(), options, min_values: 1, max_values: 1 }
    }

    /// Menu allowing any number of options, from one up to all of them.
    pub fn multi(custom_id: impl Into<String>, placeholder: impl Into<String>, options: Vec<SelectOption>) -> Self {
        let max_values = options.len().max(1);
        Self { max_values, ..Self::new(custom_id, placeholder, options) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Component {
    Button(Button),
    Select(SelectMenu),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

/// A message body: fallback text, embeds and interactive rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplate {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub rows: Vec<ActionRow>,
    pub ephemeral: bool,
}

impl MessageTemplate {
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flat_map(|row| row.components.iter()).filter_map(|component| match component {
            Component::Button(button) => Some(button),
            Component::Select(_) => None,
        })
    }

    pub fn selects(&self) -> impl Iterator<Item = &SelectMenu> {
        self.rows.iter().flat_map(|row| row.components.iter()).filter_map(|component| match component {
            Component::Select(select) => Some(select),
            Component::Button(_) => None,
        })
    }
}

pub struct MessageBuilder {
    content: String,
    embeds: Vec<Embed>,
    rows: Vec<ActionRow>,
    ephemeral: bool,
}

impl MessageBuilder {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), rows: Vec::new(), ephemeral: false }
    }

    pub fn embed<F>(mut self, title: impl Into<String>, color: Color, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embeds.push(builder.build(title.into(), color));
        self
    }

    pub fn row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut RowBuilder),
    {
        let mut builder = RowBuilder::default();
        build(&mut builder);
        if !builder.components.is_empty() {
            self.rows.push(ActionRow { components: builder.components });
        }
        self
    }

    /// Lays buttons out left to right, starting a new row every five.
    pub fn button_rows(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        let buttons: Vec<Button> = buttons.into_iter().collect();
        for chunk in buttons.chunks(BUTTONS_PER_ROW) {
            self.rows.push(ActionRow {
                components: chunk.iter().cloned().map(Component::Button).collect(),
            });
        }
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            content: self.content,
            embeds: self.embeds,
            rows: self.rows,
            ephemeral: self.ephemeral,
        }
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    lines: Vec<String>,
    fields: Vec<EmbedField>,
    footer: Option<String>,
}

impl EmbedBuilder {
    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl AsRef<str>, inline: bool) -> &mut Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: clip(value.as_ref(), FIELD_VALUE_MAX),
            inline,
        });
        self
    }

    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.footer = Some(text.into());
        self
    }

    fn build(self, title: String, color: Color) -> Embed {
        Embed { title, description: self.lines.join("\n"), color, fields: self.fields, footer: self.footer }
    }
}

#[derive(Default)]
pub struct RowBuilder {
    components: Vec<Component>,
}

impl RowBuilder {
    pub fn button(&mut self, button: Button) -> &mut Self {
        self.components.push(Component::Button(button));
        self
    }

    pub fn select(&mut self, select: SelectMenu) -> &mut Self {
        self.components.push(Component::Select(select));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputStyle {
    Short,
    Paragraph,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub style: InputStyle,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub required: bool,
}

impl TextInput {
    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            placeholder: None,
            style: InputStyle::Short,
            min_length: None,
            max_length: None,
            required: true,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn length(mut self, min: Option<u16>, max: u16) -> Self {
        self.min_length = min;
        self.max_length = Some(max);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalTemplate {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Plain ephemeral reply.
pub fn notice(text: impl Into<String>) -> MessageTemplate {
    MessageBuilder::new(text).ephemeral().build()
}

pub fn error_message(error: &InterfaceError) -> MessageTemplate {
    let summary = error.user_message();
    MessageBuilder::new(summary.clone())
        .embed("Something went wrong", Color::Red, |embed| {
            embed.line(summary).footer(format!("Reference: {}", error.correlation_id()));
        })
        .ephemeral()
        .build()
}

#[cfg(test)]
mod tests {
    use guildhall_core::errors::InterfaceError;

    use super::{clip, error_message, Button, ButtonStyle, Color, MessageBuilder};

    #[test]
    fn button_rows_wrap_every_five() {
        let message = MessageBuilder::new("poll")
            .button_rows((0..7).map(|index| Button::new(format!("b{index}"), "x")))
            .build();

        assert_eq!(message.rows.len(), 2);
        assert_eq!(message.rows[0].components.len(), 5);
        assert_eq!(message.buttons().count(), 7);
    }

    #[test]
    fn embed_builder_joins_lines_and_clips_fields() {
        let message = MessageBuilder::new("summary")
            .embed("Title", Color::Blue, |embed| {
                embed.line("first").blank().line("second").field("big", "x".repeat(2000), false);
            })
            .row(|row| {
                row.button(Button::new("go", "Go").style(ButtonStyle::Success));
            })
            .ephemeral()
            .build();

        let embed = &message.embeds[0];
        assert_eq!(embed.description, "first\n\nsecond");
        assert_eq!(embed.fields[0].value.chars().count(), 1024);
        assert!(message.ephemeral);
    }

    #[test]
    fn clip_respects_character_boundaries() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("ãããããããããã", 6), "ããã...");
    }

    #[test]
    fn error_message_carries_reference() {
        let message = error_message(&InterfaceError::Forbidden {
            message: "Only organizers can do that.".to_owned(),
            correlation_id: "ix-9".to_owned(),
        });

        assert!(message.ephemeral);
        assert_eq!(message.content, "❌ Only organizers can do that.");
        assert_eq!(message.embeds[0].footer.as_deref(), Some("Reference: ix-9"));
    }
}
