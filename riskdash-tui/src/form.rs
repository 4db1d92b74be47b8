//! The transaction entry form.
//!
//! Six single-line inputs in a fixed order. Values survive a submit so the
//! operator can tweak one field and resubmit.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use riskdash_verify::{SubmissionError, TransactionSubmission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    CardId,
    MerchantId,
    Amount,
    LocationId,
    DeviceId,
    IpAddress,
}

impl FieldId {
    pub const ALL: [FieldId; 6] = [
        FieldId::CardId,
        FieldId::MerchantId,
        FieldId::Amount,
        FieldId::LocationId,
        FieldId::DeviceId,
        FieldId::IpAddress,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FieldId::CardId => "Card ID",
            FieldId::MerchantId => "Merchant ID",
            FieldId::Amount => "Amount",
            FieldId::LocationId => "Location ID",
            FieldId::DeviceId => "Device ID",
            FieldId::IpAddress => "IP Address",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            FieldId::CardId => "Enter card ID",
            FieldId::MerchantId => "Enter merchant ID",
            FieldId::Amount => "Enter amount",
            FieldId::LocationId => "Enter location ID (optional)",
            FieldId::DeviceId => "Enter device ID (optional)",
            FieldId::IpAddress => "Enter IP address (optional)",
        }
    }

    pub fn required(self) -> bool {
        matches!(
            self,
            FieldId::CardId | FieldId::MerchantId | FieldId::Amount
        )
    }

    /// Wire name, as used in [`SubmissionError::Missing`].
    pub fn key(self) -> &'static str {
        match self {
            FieldId::CardId => "card_id",
            FieldId::MerchantId => "merchant_id",
            FieldId::Amount => "amount",
            FieldId::LocationId => "location_id",
            FieldId::DeviceId => "device_id",
            FieldId::IpAddress => "ip_address",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A single-line editor. `cursor` is a byte offset that always sits on a
/// char boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        while self.cursor > 0 && !self.value.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
    }

    fn right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor += 1;
        while self.cursor < self.value.len() && !self.value.is_char_boundary(self.cursor) {
            self.cursor += 1;
        }
    }

    fn home(&mut self) {
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.cursor = self.value.len();
    }

    fn insert(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let end = self.cursor;
        self.left();
        self.value.drain(self.cursor..end);
    }

    fn delete(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        let start = self.cursor;
        let mut end = start + 1;
        while end < self.value.len() && !self.value.is_char_boundary(end) {
            end += 1;
        }
        self.value.drain(start..end);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    /// Key not handled by the form.
    Ignored,
    /// Focus or content changed; redraw.
    Changed,
    Submit,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    inputs: [TextInput; 6],
    focus: usize,
    notice: Option<String>,
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self, field: FieldId) -> &TextInput {
        &self.inputs[field.index()]
    }

    pub fn input_mut(&mut self, field: FieldId) -> &mut TextInput {
        &mut self.inputs[field.index()]
    }

    pub fn focused(&self) -> FieldId {
        FieldId::ALL[self.focus]
    }

    pub fn focus(&mut self, field: FieldId) {
        self.focus = field.index();
    }

    /// Validation message from the last refused submit, cleared on the next edit.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % FieldId::ALL.len();
                return FormAction::Changed;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + FieldId::ALL.len() - 1) % FieldId::ALL.len();
                return FormAction::Changed;
            }
            _ => {}
        }

        let input = &mut self.inputs[self.focus];
        match key.code {
            KeyCode::Left => input.left(),
            KeyCode::Right => input.right(),
            KeyCode::Home => input.home(),
            KeyCode::End => input.end(),
            KeyCode::Backspace => input.backspace(),
            KeyCode::Delete => input.delete(),
            KeyCode::Esc => input.clear(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                input.insert(ch)
            }
            _ => return FormAction::Ignored,
        }
        self.notice = None;
        FormAction::Changed
    }

    /// Build the outbound payload from the current values.
    ///
    /// Required fields are checked in display order, matching what a browser
    /// reports first. The form keeps its values either way.
    pub fn to_submission(&self) -> Result<TransactionSubmission, SubmissionError> {
        let card_id = self.input(FieldId::CardId).value().trim();
        if card_id.is_empty() {
            return Err(SubmissionError::Missing(FieldId::CardId.key()));
        }
        let merchant_id = self.input(FieldId::MerchantId).value().trim();
        if merchant_id.is_empty() {
            return Err(SubmissionError::Missing(FieldId::MerchantId.key()));
        }
        let amount = parse_amount(self.input(FieldId::Amount).value())?;

        Ok(TransactionSubmission::new(card_id, merchant_id, amount)?
            .with_location_id(parse_location_id(self.input(FieldId::LocationId).value()))
            .with_device_id(self.input(FieldId::DeviceId).value().trim())
            .with_ip_address(self.input(FieldId::IpAddress).value().trim()))
    }

    /// Record a refused submit: show the notice and move focus to the field.
    pub fn reject(&mut self, err: &SubmissionError) {
        let notice = match err {
            SubmissionError::Missing(key) => {
                match FieldId::ALL.into_iter().find(|f| f.key() == *key) {
                    Some(field) => {
                        self.focus = field.index();
                        format!("{} is required", field.label())
                    }
                    None => err.to_string(),
                }
            }
            SubmissionError::InvalidAmount(_) => {
                self.focus = FieldId::Amount.index();
                err.to_string()
            }
        };
        self.notice = Some(notice);
    }
}

/// A number field holding text that is not a number reads as empty.
fn parse_amount(raw: &str) -> Result<f64, SubmissionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SubmissionError::Missing(FieldId::Amount.key()));
    }
    let amount: f64 = raw
        .parse()
        .map_err(|_| SubmissionError::Missing(FieldId::Amount.key()))?;
    if !amount.is_finite() {
        return Err(SubmissionError::InvalidAmount(raw.to_string()));
    }
    Ok(amount)
}

/// Blank or non-numeric yields `None`, never zero. Fractions truncate toward zero.
pub fn parse_location_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
        .map(|v| v.trunc() as i64)
}
