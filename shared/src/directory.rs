//! Lobby membership as tracked by the host
//!
//! One entry per joined peer, keyed by the channel it talks over. The host
//! itself is never stored here; it is prepended when the list is published.

use crate::protocol::LobbyUser;
use crate::transport::ChannelId;
use log::info;

/// A peer in the lobby
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub channel: ChannelId,
    /// Empty until the peer announces a name
    pub username: String,
    /// Set once the peer reports it is on the game screen
    pub staged: bool,
    /// Present when the host moved the lobby to the game screen, so the
    /// start waits for it
    pub summoned: bool,
}

impl Member {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            username: String::new(),
            staged: false,
            summoned: false,
        }
    }
}

/// Members in join order
#[derive(Debug, Default)]
pub struct MemberDirectory {
    members: Vec<Member>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer. Returns false if the channel is already known.
    pub fn add(&mut self, channel: ChannelId) -> bool {
        if self.get(&channel).is_some() {
            return false;
        }
        info!("Member joined on {}", channel);
        self.members.push(Member::new(channel));
        true
    }

    /// Drops a peer, returning its last known entry
    pub fn remove(&mut self, channel: &str) -> Option<Member> {
        let index = self.members.iter().position(|m| m.channel == channel)?;
        let member = self.members.remove(index);
        info!("Member {:?} left ({})", member.username, member.channel);
        Some(member)
    }

    pub fn get(&self, channel: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.channel == channel)
    }

    /// Returns false for an unknown channel
    pub fn set_username(&mut self, channel: &str, username: &str) -> bool {
        match self.members.iter_mut().find(|m| m.channel == channel) {
            Some(member) => {
                member.username = username.to_string();
                true
            }
            None => false,
        }
    }

    /// Returns false for an unknown channel
    pub fn set_staged(&mut self, channel: &str) -> bool {
        match self.members.iter_mut().find(|m| m.channel == channel) {
            Some(member) => {
                member.staged = true;
                true
            }
            None => false,
        }
    }

    /// True when every known peer is staged, including when there are none
    pub fn all_staged(&self) -> bool {
        self.members.iter().all(|m| m.staged)
    }

    /// Marks everyone currently present as expected on the game screen.
    /// Returns how many members that is.
    pub fn summon_all(&mut self) -> usize {
        for member in &mut self.members {
            member.summoned = true;
        }
        self.members.len()
    }

    /// True when every summoned member is staged. Peers that joined after
    /// the summons never got it and are not waited for.
    pub fn summoned_staged(&self) -> bool {
        self.members.iter().filter(|m| m.summoned).all(|m| m.staged)
    }

    pub fn staged_count(&self) -> usize {
        self.members.iter().filter(|m| m.staged).count()
    }

    /// The published membership list: host first, then peers in join order
    pub fn users(&self, host_name: &str) -> Vec<LobbyUser> {
        std::iter::once(LobbyUser {
            username: host_name.to_string(),
            host: true,
        })
        .chain(self.members.iter().map(|m| LobbyUser {
            username: m.username.clone(),
            host: false,
        }))
        .collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.members.iter().map(|m| &m.channel)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_members() {
        let mut directory = MemberDirectory::new();
        assert!(directory.add("a".into()));
        assert!(directory.add("b".into()));
        assert!(!directory.add("a".into()));
        assert_eq!(directory.len(), 2);

        let removed = directory.remove("a").unwrap();
        assert_eq!(removed.channel, "a");
        assert!(directory.remove("a").is_none());
        assert_eq!(directory.channels().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_unknown_channel_updates_are_rejected() {
        let mut directory = MemberDirectory::new();
        assert!(!directory.set_username("ghost", "casper"));
        assert!(!directory.set_staged("ghost"));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_user_list_puts_host_first() {
        let mut directory = MemberDirectory::new();
        directory.add("a".into());
        directory.add("b".into());
        directory.set_username("b", "bob");

        let users = directory.users("hannah");
        assert_eq!(
            users,
            vec![
                LobbyUser {
                    username: "hannah".into(),
                    host: true
                },
                LobbyUser {
                    username: String::new(),
                    host: false
                },
                LobbyUser {
                    username: "bob".into(),
                    host: false
                },
            ]
        );
    }

    #[test]
    fn test_all_staged() {
        let mut directory = MemberDirectory::new();
        assert!(directory.all_staged());

        directory.add("a".into());
        directory.add("b".into());
        assert!(!directory.all_staged());

        directory.set_staged("a");
        assert!(!directory.all_staged());
        assert_eq!(directory.staged_count(), 1);

        directory.set_staged("b");
        assert!(directory.all_staged());

        // A late joiner blocks the start again
        directory.add("c".into());
        assert!(!directory.all_staged());
    }

    #[test]
    fn test_summoned_staged_ignores_late_joiners() {
        let mut directory = MemberDirectory::new();
        directory.add("a".into());
        directory.add("b".into());
        assert_eq!(directory.summon_all(), 2);

        directory.add("late".into());
        assert!(!directory.get("late").unwrap().summoned);

        directory.set_staged("a");
        assert!(!directory.summoned_staged());
        directory.set_staged("b");
        assert!(directory.summoned_staged());
        assert!(!directory.all_staged());

        // A summoned member leaving no longer blocks anyone
        let mut directory = MemberDirectory::new();
        directory.add("a".into());
        directory.add("b".into());
        directory.summon_all();
        directory.set_staged("a");
        directory.remove("b");
        assert!(directory.summoned_staged());
    }
}
