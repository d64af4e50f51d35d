//! Built-in question bank used when no TOML bank is provided (and merged
//! under it when one is). Also the constant topic a brand-new profile falls
//! back to when the bank is empty.

use uuid::Uuid;

use crate::domain::QuizQuestion;

/// Default topic seeded into a new profile when the question bank is empty.
pub const FALLBACK_TOPIC: &str = "Algebra";

struct Seed {
  topic: &'static str,
  question: &'static str,
  options: [&'static str; 3],
  correct_answer: &'static str,
  difficulty: &'static str,
  hint: &'static str,
  explanation: &'static str,
}

const SEEDS: &[Seed] = &[
  Seed {
    topic: "Algebra",
    question: "Solve: 2x + 5 = 15",
    options: ["x=5", "x=10", "x=2.5"],
    correct_answer: "x=5",
    difficulty: "easy",
    hint: "Isolate the variable x.",
    explanation: "Subtract 5 from both sides to get 2x = 10, then divide by 2.",
  },
  Seed {
    topic: "Algebra",
    question: "What is the slope of the line y = 3x - 7?",
    options: ["3", "-7", "7"],
    correct_answer: "3",
    difficulty: "easy",
    hint: "The equation is in slope-intercept form (y = mx + b).",
    explanation: "In y = mx + b, m is the slope. Here, m = 3.",
  },
  Seed {
    topic: "Algebra",
    question: "Factor: x² - 4",
    options: ["(x-2)(x+2)", "(x-2)(x-2)", "(x+4)(x-1)"],
    correct_answer: "(x-2)(x+2)",
    difficulty: "medium",
    hint: "This is a difference of squares.",
    explanation: "x² - 4 = x² - 2² = (x-2)(x+2)",
  },
  Seed {
    topic: "Calculus",
    question: "What is the derivative of x²?",
    options: ["2x", "x", "x³/3"],
    correct_answer: "2x",
    difficulty: "easy",
    hint: "Use the power rule.",
    explanation: "The power rule: d/dx(x^n) = nx^(n-1). For x², the derivative is 2x.",
  },
  Seed {
    topic: "Calculus",
    question: "What is the integral of 3x² dx?",
    options: ["x³ + C", "6x + C", "3x³ + C"],
    correct_answer: "x³ + C",
    difficulty: "medium",
    hint: "Use reverse power rule.",
    explanation: "Integral of x^n is x^(n+1)/(n+1). For 3x², it is 3(x³/3) = x³ + C.",
  },
  Seed {
    topic: "Statistics",
    question: "What is the mean of 2, 4, 6?",
    options: ["4", "3", "5"],
    correct_answer: "4",
    difficulty: "easy",
    hint: "Mean is the average.",
    explanation: "Sum = 2+4+6 = 12. Count = 3. Mean = 12/3 = 4.",
  },
  Seed {
    topic: "Statistics",
    question: "What is the median in a sorted dataset?",
    options: ["Middle value", "Average", "Most frequent"],
    correct_answer: "Middle value",
    difficulty: "easy",
    hint: "Think \"middle\".",
    explanation: "The median is the middle value when data is sorted.",
  },
  Seed {
    topic: "Geometry",
    question: "Area of a circle with radius r?",
    options: ["πr²", "2πr", "πr"],
    correct_answer: "πr²",
    difficulty: "easy",
    hint: "Area involves squaring.",
    explanation: "The formula is A = πr².",
  },
  Seed {
    topic: "Geometry",
    question: "Sum of angles in a triangle?",
    options: ["180°", "90°", "360°"],
    correct_answer: "180°",
    difficulty: "easy",
    hint: "A fundamental property.",
    explanation: "The sum of interior angles in any triangle is always 180°.",
  },
];

/// Materialize the built-in bank with fresh ids.
pub fn seed_questions() -> Vec<QuizQuestion> {
  SEEDS
    .iter()
    .map(|s| QuizQuestion {
      id: Uuid::new_v4().to_string(),
      topic: s.topic.to_string(),
      question: s.question.to_string(),
      options: s.options.iter().map(|o| o.to_string()).collect(),
      correct_answer: s.correct_answer.to_string(),
      difficulty: s.difficulty.to_string(),
      hint: s.hint.to_string(),
      explanation: s.explanation.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_seed_keeps_the_answer_inside_the_options() {
    for q in seed_questions() {
      assert!(q.options.contains(&q.correct_answer), "bad seed: {}", q.question);
      assert_eq!(q.options.len(), 3);
    }
  }
}
