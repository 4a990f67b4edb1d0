//! Canned help texts.
//!
//! These are pre-marked-up for Telegram's HTML parse mode, so reserved
//! characters inside them are already entity-escaped.

use crate::chat::users::Role;
use crate::lexicon::HelpKind;

/// First-contact walkthrough, also the fallback for plain "help".
pub const WELCOME_MSG: &str = "Welcome to the weather bot! Before I can provide weather information, I need to know your <b>location</b>.

You can easily set your location by sending me a message like, <b>my location is 80809</b> or, <b>my location is pikes peak,co</b> or <b>location 38.8408655,-105.0441532</b> etc.

For GPS coordinates, you also can assign a label to the location with an additional message like <b>location label \"pikes peak\"</b>
To get help later on location setup, send a message with <b>help location</b>

After setting your location start with a simple message like <b>temps</b> or <b>any rain this week</b>

For a good list of examples, send a message with <b>help examples</b>";

/// Location-setting examples, also appended when no location is set.
pub const HELP_LOCATION_MSG: &str = "
Here are some examples of messages you can send to set your location:

<b>my location is 80809</b>
<b>my location is pikes peak,co</b>
<b>location 38.8408655,-105.0441532</b>
<b>location label \"pikes peak\"</b>";

const HELP_EXAMPLES_MSG: &str = "
Here are some examples of messages you can send to get weather information for your current location:

<b>temps</b>
<b>any rain this week</b>
<b>any windy days</b>
<b>any bad weather this week</b>
<b>rain over 50%</b>
<b>no rain</b>
<b>no wind</b>
<b>wind over 10 mph</b>
<b>weather next 2 days</b>
<b>weather this weekend</b>
<b>find cloudy days</b>
<b>find sunny days</b>
<b>weather on wed</b>
<b>tomorrow</b>
<b>today</b>
<b>tonight</b>

For a good list of SHORTCUT examples, send a message with <b>help shortcuts</b>";

const HELP_SHORTCUTS_MSG: &str = "
Here are some good SHORTCUT examples of messages you can send to get weather information for your current location:

<b>?</b> (weekly summary of daily temps)
<b>?&gt;90</b> (find days hotter than 90, use your own number)
<b>?&lt;35</b> (find days colder than 35, use your own number)
<b>freeze</b> (find days or nights colder than 32)
<b>cool</b> or <b>chilly</b> (find daytime temps cooler than 60)
<b>bad weather</b> (searches forecast for bad weather related keywords)
<b>hot</b> (find daytime temps hotter than 85)";

const HELP_ADMINHOST_MSG: &str = "
Here are some Admin/Host examples of messages you can send to manage the bot:

<b>show users</b> (lists all users)
<b>disable user [ID] for [reason]</b> (disables a user)
<b>enable user [ID]</b> (enables a user)
<b>add admin to [ID]</b> (adds user to admin group)
<b>remove admin from [ID]</b> (removes user from admin group)";

/// Help text for a request. The admin/host page is only served to
/// privileged users; everyone else gets the general walkthrough.
pub fn text(kind: HelpKind, role: Role) -> String {
    match kind {
        HelpKind::Examples => HELP_EXAMPLES_MSG.to_owned(),
        HelpKind::Location => HELP_LOCATION_MSG.to_owned(),
        HelpKind::Shortcuts => HELP_SHORTCUTS_MSG.to_owned(),
        HelpKind::AdminHost if role.is_privileged() => HELP_ADMINHOST_MSG.to_owned(),
        HelpKind::AdminHost | HelpKind::General => {
            format!("Lets's start from the beginning...\n\n{WELCOME_MSG}")
        }
    }
}
