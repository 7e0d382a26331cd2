//! Console grammar expressed as a static AST.
//!
//! The parser and the `help` command read the same structure, so keywords and
//! usage text stay in sync.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Press,
    Button,
    Advance,
    Brightness,
    Status,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTag {
    ButtonDown,
    ButtonUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    None,
    Duration,
    Integer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub grammar: &'static Node,
    pub usage: &'static str,
    pub summary: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    End,
    /// One keyword out of `choices`; `default` applies when the line ends.
    Choice {
        choices: &'static [ChoiceBranch],
        default: Option<ChoiceTag>,
    },
    /// Mandatory positional value.
    Argument {
        label: &'static str,
        value: ValueSpec,
        next: &'static Node,
    },
    /// Optional free-form topic word.
    Topic { next: &'static Node },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub keyword: &'static str,
    pub tag: ChoiceTag,
    pub next: &'static Node,
}

const END: Node = Node::End;

const BUTTON_CHOICES: [ChoiceBranch; 2] = [
    ChoiceBranch {
        keyword: "down",
        tag: ChoiceTag::ButtonDown,
        next: &END,
    },
    ChoiceBranch {
        keyword: "up",
        tag: ChoiceTag::ButtonUp,
        next: &END,
    },
];

const BUTTON_GRAMMAR: Node = Node::Choice {
    choices: &BUTTON_CHOICES,
    default: None,
};

const ADVANCE_GRAMMAR: Node = Node::Argument {
    label: "duration",
    value: ValueSpec::Duration,
    next: &END,
};

const BRIGHTNESS_GRAMMAR: Node = Node::Argument {
    label: "percent",
    value: ValueSpec::Integer,
    next: &END,
};

const HELP_GRAMMAR: Node = Node::Topic { next: &END };

const COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        name: "press",
        tag: CommandTag::Press,
        grammar: &END,
        usage: "press",
        summary: "queue one button press",
    },
    CommandSpec {
        name: "button",
        tag: CommandTag::Button,
        grammar: &BUTTON_GRAMMAR,
        usage: "button <down|up>",
        summary: "drive the raw button line",
    },
    CommandSpec {
        name: "advance",
        tag: CommandTag::Advance,
        grammar: &ADVANCE_GRAMMAR,
        usage: "advance <N>ms|<N>s",
        summary: "move the simulated clock forward",
    },
    CommandSpec {
        name: "brightness",
        tag: CommandTag::Brightness,
        grammar: &BRIGHTNESS_GRAMMAR,
        usage: "brightness <0-100>",
        summary: "set lamp brightness in percent",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        grammar: &END,
        usage: "status",
        summary: "print lamp and button state",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        grammar: &HELP_GRAMMAR,
        usage: "help [command]",
        summary: "list commands or describe one",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::Press => &COMMANDS[0],
        CommandTag::Button => &COMMANDS[1],
        CommandTag::Advance => &COMMANDS[2],
        CommandTag::Brightness => &COMMANDS[3],
        CommandTag::Status => &COMMANDS[4],
        CommandTag::Help => &COMMANDS[5],
    }
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_resolve_to_matching_specs() {
        for spec in commands() {
            assert_eq!(command(spec.tag).name, spec.name);
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(find("BrIgHtNeSs").map(|spec| spec.tag), Some(CommandTag::Brightness));
        assert!(find("reboot").is_none());
    }
}
