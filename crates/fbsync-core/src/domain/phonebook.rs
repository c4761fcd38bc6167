/// Hard device limit of numbers per phonebook entry.
pub const MAX_NUMBERS_PER_CONTACT: usize = 9;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phonebook {
    pub name: String,
    pub timestamp: Option<i64>,
    pub contacts: Vec<DeviceContact>,
}

impl Phonebook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            contacts: Vec::new(),
        }
    }

    pub fn numbers(&self) -> impl Iterator<Item = (&DeviceContact, &DeviceNumber)> {
        self.contacts
            .iter()
            .flat_map(|contact| contact.numbers.iter().map(move |number| (contact, number)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceContact {
    pub external_id: Option<String>,
    pub name: String,
    pub numbers: Vec<DeviceNumber>,
    pub emails: Vec<DeviceEmail>,
    pub vip: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceNumber {
    pub index: usize,
    pub number: String,
    pub kind: String,
    pub quickdial: Option<String>,
    pub vanity: Option<String>,
    pub prio: Option<String>,
}

impl DeviceNumber {
    pub fn new(index: usize, number: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            index,
            number: number.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// A quick-dial code counts when it parses as a non-negative integer.
    pub fn has_quickdial(&self) -> bool {
        self.quickdial
            .as_deref()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .is_some_and(|value| value >= 0)
    }

    pub fn has_vanity(&self) -> bool {
        self.vanity
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceEmail {
    pub index: usize,
    pub address: String,
    pub classifier: Option<String>,
}
