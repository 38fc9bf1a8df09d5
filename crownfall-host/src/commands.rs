//! Console line parsing and money formatting.
//!
//! Line grammar: `<player> <x> <z> <command> [args...]`. The region is
//! part of every line because the engine resolves "here" commands
//! against the actor's position.

use crownfall_core::{Command, PlayerId, Rank, Region};

pub struct ParsedLine {
    pub actor: PlayerId,
    pub at: Region,
    pub command: Command,
}

pub fn parse_line(line: &str) -> Result<ParsedLine, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err("usage: <player> <x> <z> <command> [args...]".to_string());
    }
    let actor = tokens[0].to_string();
    let x: i32 = tokens[1].parse().map_err(|_| format!("bad x coordinate '{}'", tokens[1]))?;
    let z: i32 = tokens[2].parse().map_err(|_| format!("bad z coordinate '{}'", tokens[2]))?;
    let command = parse_command(&tokens[3..])?;
    Ok(ParsedLine {
        actor,
        at: Region::new(x, z),
        command,
    })
}

fn parse_command(tokens: &[&str]) -> Result<Command, String> {
    let arg = |i: usize| -> Result<String, String> {
        tokens
            .get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| format!("'{}' needs more arguments", tokens[0]))
    };
    let amount = |i: usize| -> Result<i64, String> {
        arg(i)?.parse().map_err(|_| "bad amount".to_string())
    };
    let war_id = |i: usize| -> Result<u64, String> {
        arg(i)?.parse().map_err(|_| "bad war id".to_string())
    };

    match tokens[0] {
        "create" => Ok(Command::CreateKingdom { name: arg(1)? }),
        "delete" => Ok(Command::RequestDelete),
        "confirm-delete" => Ok(Command::ConfirmDelete),

        "claim" => Ok(Command::Claim),
        "unclaim" => Ok(Command::Unclaim),
        "sethome" => Ok(Command::SetHome),

        "invite" => Ok(Command::Invite { player: arg(1)? }),
        "accept" => Ok(Command::AcceptInvite),
        "decline" => Ok(Command::DeclineInvite),
        "leave" => Ok(Command::Leave),
        "kick" => Ok(Command::Kick { player: arg(1)? }),
        "rank" => Ok(Command::SetRank {
            player: arg(1)?,
            rank: arg(2)?.parse::<Rank>().map_err(|e| e.to_string())?,
        }),
        "transfer" => Ok(Command::TransferOwnership { player: arg(1)? }),

        "deposit" => Ok(Command::Deposit { amount: amount(1)? }),
        "withdraw" => Ok(Command::Withdraw { amount: amount(1)? }),

        "pclaim" => Ok(Command::PersonalClaim),
        "punclaim" => Ok(Command::PersonalUnclaim),
        "ptransfer" => Ok(Command::PersonalTransfer { to: arg(1)? }),

        "set" => {
            let value = match arg(2)?.as_str() {
                "true" | "on" => true,
                "false" | "off" => false,
                other => return Err(format!("bad value '{}', expected true/false", other)),
            };
            Ok(Command::SetSetting { key: arg(1)?, value })
        }

        "ally" => Ok(Command::AddAlly { kingdom: arg(1)? }),
        "unally" => Ok(Command::RemoveAlly { kingdom: arg(1)? }),
        "enemy" => Ok(Command::AddEnemy { kingdom: arg(1)? }),
        "unenemy" => Ok(Command::RemoveEnemy { kingdom: arg(1)? }),

        "war" => Ok(Command::DeclareWar { kingdom: arg(1)? }),
        "endwar" => Ok(Command::EndWar { war: war_id(1)? }),
        "surrender" => Ok(Command::Surrender { war: war_id(1)? }),
        "claimfallen" => Ok(Command::ClaimFallen { war: war_id(1)? }),
        "reclaim" => Ok(Command::Reclaim),

        "info" => Ok(Command::Info {
            kingdom: tokens.get(1).map(|s| s.to_string()),
        }),
        "here" => Ok(Command::Here),
        "wars" => Ok(Command::ListWars),

        other => Err(format!("unknown command '{}'", other)),
    }
}

/// Renders a bronze amount as gold/silver/bronze coins.
/// 1 gold = 100 silver, 1 silver = 100 bronze.
pub fn format_coins(bronze: i64) -> String {
    let sign = if bronze < 0 { "-" } else { "" };
    let bronze = bronze.abs();
    let gold = bronze / 10_000;
    let silver = (bronze % 10_000) / 100;
    let bronze = bronze % 100;
    match (gold, silver, bronze) {
        (0, 0, b) => format!("{}{}b", sign, b),
        (0, s, b) => format!("{}{}s {}b", sign, s, b),
        (g, s, b) => format!("{}{}g {}s {}b", sign, g, s, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let parsed = parse_line("alice 3 -2 create Avalon").unwrap();
        assert_eq!(parsed.actor, "alice");
        assert_eq!(parsed.at, Region::new(3, -2));
        assert_eq!(parsed.command, Command::CreateKingdom { name: "Avalon".into() });
    }

    #[test]
    fn test_parse_command_variants() {
        let cmd = |s: &str| {
            parse_line(&format!("alice 0 0 {}", s))
                .map(|p| p.command)
        };
        assert_eq!(cmd("claim").unwrap(), Command::Claim);
        assert_eq!(cmd("deposit 500").unwrap(), Command::Deposit { amount: 500 });
        assert_eq!(
            cmd("rank bob officer").unwrap(),
            Command::SetRank { player: "bob".into(), rank: Rank::Officer }
        );
        assert_eq!(
            cmd("set pvp on").unwrap(),
            Command::SetSetting { key: "pvp".into(), value: true }
        );
        assert_eq!(cmd("surrender 3").unwrap(), Command::Surrender { war: 3 });
        assert_eq!(cmd("info").unwrap(), Command::Info { kingdom: None });
        assert_eq!(
            cmd("info Avalon").unwrap(),
            Command::Info { kingdom: Some("Avalon".into()) }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("alice 0 claim").is_err());
        assert!(parse_line("alice x 0 claim").is_err());
        assert!(parse_line("alice 0 0 conjure").is_err());
        assert!(parse_line("alice 0 0 deposit lots").is_err());
        assert!(parse_line("alice 0 0 rank bob king").is_err());
        assert!(parse_line("alice 0 0 invite").is_err());
    }

    #[test]
    fn test_format_coins() {
        assert_eq!(format_coins(0), "0b");
        assert_eq!(format_coins(45), "45b");
        assert_eq!(format_coins(250), "2s 50b");
        assert_eq!(format_coins(12_345), "1g 23s 45b");
        assert_eq!(format_coins(-250), "-2s 50b");
    }
}
