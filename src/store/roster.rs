//! College rosters

use std::collections::HashMap;

use super::{Error, cache::RosterSource};
use crate::participant::Student;

/// Students registered per college
#[derive(Debug, Default, Clone)]
pub struct Rosters {
    colleges: HashMap<String, Vec<Student>>,
}

impl Rosters {
    /// Creates an empty roster store
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends students to a college, creating it if needed
    ///
    /// # Returns
    ///
    /// The college's full roster after the append
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the college name is blank.
    pub fn add(&mut self, college_name: &str, students: Vec<Student>) -> Result<&[Student], Error> {
        let college_name = college_name.trim();
        if college_name.is_empty() {
            return Err(Error::Validation(
                "collegeName and students array required".to_owned(),
            ));
        }

        log::debug!("adding {} students to {college_name}", students.len());

        let roster = self.colleges.entry(college_name.to_owned()).or_default();
        roster.extend(students);
        Ok(roster)
    }

    /// Returns `{college_name: students}`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown college.
    pub fn get(&self, college_name: &str) -> Result<HashMap<String, Vec<Student>>, Error> {
        let students = self.students(college_name)?;
        Ok(HashMap::from([(college_name.to_owned(), students)]))
    }

    /// Returns the students of a college
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown college.
    pub fn students(&self, college_name: &str) -> Result<Vec<Student>, Error> {
        self.colleges
            .get(college_name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("college {college_name}")))
    }
}

impl RosterSource for Rosters {
    fn fetch_roster(&self, college_name: &str) -> Result<Vec<Student>, Error> {
        self.students(college_name)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn student(name: &str) -> Student {
        Student {
            name: name.to_owned(),
            roll_no: name.to_lowercase(),
        }
    }

    #[test]
    fn test_add_appends() {
        let mut rosters = Rosters::new();
        rosters.add("X", vec![student("A")]).unwrap();
        let roster = rosters.add("X", vec![student("B"), student("C")]).unwrap();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].name, "A");
    }

    #[test]
    fn test_get_shape() {
        let mut rosters = Rosters::new();
        rosters.add("X", vec![student("A")]).unwrap();
        let json = serde_json::to_value(rosters.get("X").unwrap()).unwrap();
        assert_eq!(json["X"][0]["rollNo"], "a");
    }

    #[test]
    fn test_errors() {
        let mut rosters = Rosters::new();
        assert!(matches!(rosters.add("  ", vec![]), Err(Error::Validation(_))));
        assert_eq!(
            rosters.get("Y"),
            Err(Error::NotFound("college Y".to_owned()))
        );
    }
}
