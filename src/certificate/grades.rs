use super::format::format_grade;
use super::{Grade, GradeCategory};

pub const NUMBER_COLUMN_WIDTH: f32 = 60.0;
pub const SUBJECT_COLUMN_WIDTH: f32 = 300.0;
pub const VALUE_COLUMN_WIDTH: f32 = 100.0;
pub const TABLE_WIDTH: f32 = NUMBER_COLUMN_WIDTH + SUBJECT_COLUMN_WIDTH + VALUE_COLUMN_WIDTH;
pub const ROW_HEIGHT: f32 = 25.0;

/// Header, average and the A/B/C group labels that are always emitted.
pub const FIXED_ROW_ALLOWANCE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Header,
    Category(&'static str),
    Grade {
        number: usize,
        name: String,
        value: String,
    },
    Average(String),
}

impl TableRow {
    pub fn is_bold(&self) -> bool {
        !matches!(self, TableRow::Grade { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeTable {
    pub rows: Vec<TableRow>,
    pub grade_count: usize,
}

impl GradeTable {
    /// Groups grades by category. A, B and C always get a label row, even
    /// when empty; D only appears when it holds at least one grade.
    pub fn build(grades: &[Grade], average: f64) -> Self {
        let mut rows = vec![TableRow::Header];
        let mut number = 0;

        for category in GradeCategory::ALL {
            let members: Vec<&Grade> = grades.iter().filter(|g| g.category == category).collect();
            if category == GradeCategory::D && members.is_empty() {
                continue;
            }

            rows.push(TableRow::Category(category.label()));
            for grade in members {
                number += 1;
                rows.push(TableRow::Grade {
                    number,
                    name: grade.name.clone(),
                    value: format_grade(grade.value),
                });
            }
        }

        rows.push(TableRow::Average(format_grade(average)));

        Self {
            rows,
            grade_count: grades.len(),
        }
    }

    /// Height reserved before the table is started on the current page.
    pub fn estimated_height(&self) -> f32 {
        (self.grade_count + FIXED_ROW_ALLOWANCE) as f32 * ROW_HEIGHT
    }
}

#[cfg(test)]
impl GradeTable {
    pub fn grade_numbers(&self) -> Vec<usize> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                TableRow::Grade { number, .. } => Some(*number),
                _ => None,
            })
            .collect()
    }

    /// Number of grade rows under each group label, in emission order.
    pub fn group_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes: Vec<(&'static str, usize)> = Vec::new();
        for row in &self.rows {
            match row {
                TableRow::Category(label) => sizes.push((label, 0)),
                TableRow::Grade { .. } => {
                    if let Some(last) = sizes.last_mut() {
                        last.1 += 1;
                    }
                }
                _ => {}
            }
        }
        sizes
    }
}
