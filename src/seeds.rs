//! Built-in level catalog. Guarantees the game is playable without a config file.

use crate::domain::{Difficulty, Level};

fn level(
  id: u32,
  title: &str,
  topic: &str,
  description: &str,
  difficulty: Difficulty,
  xp_reward: u32,
  mission_objective: &str,
  starter_code: &str,
  hints: &[&str],
) -> Level {
  Level {
    id,
    title: title.into(),
    description: description.into(),
    topic: topic.into(),
    difficulty,
    xp_reward,
    locked: id != 1,
    mission_objective: mission_objective.into(),
    starter_code: starter_code.into(),
    hints: hints.iter().map(|h| h.to_string()).collect(),
  }
}

/// The five starter missions, in unlock order.
pub fn seed_levels() -> Vec<Level> {
  vec![
    level(
      1,
      "System Initialization",
      "Variables & Print",
      "Initialize the Neural Link by defining core variables.",
      Difficulty::Novice,
      100,
      "Create a variable named `status` and assign it the string \"Active\". Then, print the `status`.",
      "# Initialize system status\n# Write your code below\n",
      &[
        "Use the '=' operator to assign values.",
        "Strings must be wrapped in quotes like \"text\".",
        "Use the print() function to output data.",
      ],
    ),
    level(
      2,
      "Data Flux",
      "Basic Arithmetic",
      "Calibrate the power output modules.",
      Difficulty::Novice,
      150,
      "Create a variable `power` with value 50. Multiply it by 2 and assign the result to a new variable `total_output`. Print `total_output`.",
      "power = 50\n# Calculate total_output below\n",
      &[
        "The multiplication symbol in Python is '*'.",
        "Make sure to define `total_output` before printing it.",
      ],
    ),
    level(
      3,
      "Logic Gatekeeper",
      "If/Else Statements",
      "Determine if the security breach is critical.",
      Difficulty::Adept,
      200,
      "Check the `threat_level` variable. If it is greater than 8, print \"Critical Alert\". Otherwise, print \"Stable\".",
      "threat_level = 9\n\n# Write your if/else logic here\n",
      &[
        "Use 'if condition:' followed by an indented block.",
        "Use 'else:' for the alternative case.",
        "Don't forget the colons ':' at the end of if/else lines.",
      ],
    ),
    level(
      4,
      "Loop Construct",
      "For Loops",
      "Iterate through the mainframe sectors to repair data.",
      Difficulty::Adept,
      300,
      "Write a loop that prints \"Repairing Sector X\" for numbers 1 through 5 (inclusive).",
      "# Use a range() loop\n",
      &[
        "range(start, stop) goes up to, but does not include, the stop number.",
        "You can use an f-string: f\"Repairing Sector {i}\"",
      ],
    ),
    level(
      5,
      "Function Protocol",
      "Functions",
      "Define a reusable protocol for encrypting messages.",
      Difficulty::Expert,
      500,
      "Define a function called `encrypt` that takes one parameter `msg`. It should print \"Encrypted: \" followed by the message.",
      "# Define your function here\n\n\n# Test your function\nencrypt(\"Secret Data\")",
      &[
        "Use 'def function_name(parameter):'",
        "Make sure the print statement inside is indented.",
      ],
    ),
  ]
}
