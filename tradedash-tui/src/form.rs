//! Minimal text-field forms: a focused field receives typed characters.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    /// Rendered as asterisks.
    pub secret: bool,
}

impl Field {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: false,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::new(label)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// Ordered fields with one focused. `editing` is on while keystrokes go to
/// the focused field instead of panel shortcuts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub fields: Vec<Field>,
    pub focus: usize,
    pub editing: bool,
}

impl FormState {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            focus: 0,
            editing: false,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push(&mut self, c: char) {
        if let Some(f) = self.fields.get_mut(self.focus) {
            f.value.push(c);
        }
    }

    pub fn pop(&mut self) {
        if let Some(f) = self.fields.get_mut(self.focus) {
            f.value.pop();
        }
    }

    pub fn value(&self, idx: usize) -> &str {
        self.fields.get(idx).map_or("", |f| f.value.as_str())
    }

    pub fn set(&mut self, idx: usize, value: impl Into<String>) {
        if let Some(f) = self.fields.get_mut(idx) {
            f.value = value.into();
        }
    }

    pub fn clear(&mut self) {
        for f in &mut self.fields {
            f.value.clear();
        }
        self.focus = 0;
    }

    pub fn focused_label(&self) -> &'static str {
        self.fields.get(self.focus).map_or("", |f| f.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_wraps_and_edits_target_focused_field() {
        let mut form = FormState::new(vec![Field::new("Email"), Field::secret("Password")]);
        form.push('a');
        form.next();
        form.push('x');
        form.push('y');
        form.pop();
        assert_eq!(form.value(0), "a");
        assert_eq!(form.value(1), "x");
        assert_eq!(form.fields[1].display(), "*");
        form.next();
        assert_eq!(form.focus, 0);
        form.prev();
        assert_eq!(form.focused_label(), "Password");
    }
}
